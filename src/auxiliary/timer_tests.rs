use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::auxiliary::timer::PhaseTimer;

/// Log sink shared between the logger and the test inspecting it.
#[derive(Clone)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "poisoned log buffer"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_timer_nested_phases() {
    let mut timer = PhaseTimer::new();
    assert_eq!(timer.depth(), 0);
    timer.start("macro-iteration");
    timer.start("integral transformation");
    assert_eq!(timer.depth(), 2);
    assert_eq!(timer.status(), "integral transformation << macro-iteration");
    timer.checkpoint("quarter transforms");
    timer.end();
    assert_eq!(timer.depth(), 1);
    timer.end();
    assert_eq!(timer.depth(), 0);
}

#[test]
fn test_timer_end_without_phase() {
    let mut timer = PhaseTimer::default();
    timer.end();
    assert_eq!(timer.depth(), 0);
}

#[test]
fn test_timer_duration_format() {
    let timer = PhaseTimer::new();
    let durations = timer.durations(std::time::Instant::now());
    assert!(durations.starts_with('['));
    assert!(durations.ends_with("]s"));
    assert_eq!(durations.matches('/').count(), 2);
}

#[test]
fn test_timer_format_logged_once() {
    let buffer = SharedBuffer(Arc::new(Mutex::new(vec![])));
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Debug)
        .target(env_logger::Target::Pipe(Box::new(buffer.clone())))
        .init();

    for _ in 0..3 {
        let mut timer = PhaseTimer::new();
        timer.start("orbital update");
        timer.end();
    }
    PhaseTimer::log_format();

    let logged = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    assert_eq!(logged.matches("Timing format").count(), 1);
    assert!(logged.contains("END OF orbital update"));
}
