//! In-process tests for the CLI runtime against the fake broker.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use natsline::test_support::{BrokerScript, FakeBroker};
use rstest::{fixture, rstest};

use crate::run;

const SETTLE: Duration = Duration::from_secs(3);

/// Cloneable in-memory sink standing in for stdout.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("capture mutex")).into_owned()
    }

    fn wait_for(&self, needle: &str) -> String {
        let deadline = Instant::now() + SETTLE;
        loop {
            let text = self.text();
            if text.contains(needle) || Instant::now() >= deadline {
                return text;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("capture mutex").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(args: &[&str]) -> Outcome {
    let stdout = Captured::default();
    let mut stderr = Vec::new();
    let argv = std::iter::once("natsline")
        .chain(args.iter().copied())
        .map(OsString::from);
    let code = run(argv, stdout.clone(), &mut stderr);
    Outcome {
        code,
        stdout: stdout.text(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    }
}

#[fixture]
fn broker() -> FakeBroker {
    FakeBroker::spawn(BrokerScript::quiet()).expect("spawn fake broker")
}

fn server_flag(broker: &FakeBroker) -> String {
    format!("127.0.0.1:{}", broker.port())
}

#[rstest]
fn pub_publishes_one_message(broker: FakeBroker) {
    let server = server_flag(&broker);
    let outcome = invoke(&["--server", &server, "pub", "orders.created", "hello"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout, "published 5 bytes to orders.created\n");
    let commands = broker.wait_for_commands(2, SETTLE);
    assert_eq!(
        commands.get(1).map(String::as_str),
        Some("PUB orders.created 5\r\nhello\r\n")
    );
}

#[rstest]
fn ping_reports_the_round_trip(broker: FakeBroker) {
    let server = server_flag(&broker);
    let outcome = invoke(&["--server", &server, "--timeout", "1", "ping"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(outcome.stdout.starts_with("PONG in "), "{}", outcome.stdout);
}

#[rstest]
fn sub_prints_deliveries_until_the_broker_hangs_up(broker: FakeBroker) {
    let server = server_flag(&broker);
    let stdout = Captured::default();
    let sink = stdout.clone();
    let session = thread::spawn(move || {
        let argv = [
            "natsline", "--server", server.as_str(), "--timeout", "1", "sub", "orders.*", "--sid", "9",
        ]
        .map(OsString::from);
        run(argv, sink, io::sink())
    });

    let commands = broker.wait_for_commands(2, SETTLE);
    assert_eq!(commands.get(1).map(String::as_str), Some("SUB orders.* 9\r\n"));
    broker
        .send("MSG orders.created 9 5\r\nhello\r\n")
        .expect("deliver message");
    let printed = stdout.wait_for("hello\n");
    broker.disconnect();
    let code = session.join().expect("session thread");

    assert_eq!(printed, "[#9] orders.created (5 bytes)\nhello\n");
    assert_eq!(code, ExitCode::FAILURE);
}

#[test]
fn unreachable_brokers_fail_with_a_diagnostic() {
    let port = {
        let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).expect("bind probe");
        listener.local_addr().expect("probe addr").port()
    };
    let server = format!("127.0.0.1:{port}");
    let outcome = invoke(&["--server", &server, "ping"]);

    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("failed to connect to broker"),
        "{}",
        outcome.stderr
    );
}

#[rstest]
#[case(&["pub", "orders"], "MESSAGE")]
#[case(&["--log-format", "xml", "ping"], "xml")]
fn usage_errors_are_reported_on_stderr(#[case] args: &[&str], #[case] needle: &str) {
    let outcome = invoke(args);

    assert_eq!(outcome.code, ExitCode::from(2));
    assert!(outcome.stderr.contains(needle), "{}", outcome.stderr);
    assert!(outcome.stdout.is_empty());
}

#[test]
fn help_goes_to_stdout() {
    let outcome = invoke(&["--help"]);

    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage: natsline"), "{}", outcome.stdout);
}
