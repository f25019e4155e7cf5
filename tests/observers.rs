use proxy_di::{ContainerConfig, DiError, DiObserver, Key, LoggingObserver, Resolver, ServiceCollection};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl DiObserver for Recorder {
    fn resolving(&self, key: &Key) {
        self.events.lock().unwrap().push(format!("resolving {}", key.type_name()));
    }

    fn resolved(&self, key: &Key, _duration: Duration) {
        self.events.lock().unwrap().push(format!("resolved {}", key.type_name()));
    }

    fn resolution_failed(&self, key: &Key, error: &DiError) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed {}: {}", key.type_name(), matches!(error, DiError::Factory(_))));
    }
}

fn collection() -> ServiceCollection {
    let mut sc = ServiceCollection::new();
    sc.with_config(ContainerConfig::default().with_sweep_interval(None));
    sc
}

#[test]
fn test_observer_sees_nested_resolutions() {
    struct Inner;
    struct Outer;

    let recorder = Arc::new(Recorder::default());
    let mut sc = collection();
    sc.add_transient_factory::<Inner, _>(|_| Ok(Inner));
    sc.add_transient_factory::<Outer, _>(|r| {
        r.resolve_required::<Inner>()?;
        Ok(Outer)
    });
    sc.add_observer(recorder.clone());

    sc.build().get_required::<Outer>();

    let events = recorder.events.lock().unwrap();
    let short: Vec<&str> = events.iter().map(|e| e.rsplit("::").next().unwrap()).collect();
    assert_eq!(short, ["Outer", "Inner", "Inner", "Outer"]);
    assert!(events[0].starts_with("resolving"));
    assert!(events[1].starts_with("resolving"));
    assert!(events[2].starts_with("resolved"));
    assert!(events[3].starts_with("resolved"));
}

#[test]
fn test_cached_instances_skip_observers() {
    let recorder = Arc::new(Recorder::default());
    let mut sc = collection();
    sc.add_singleton_factory::<u16, _>(|_| Ok(80));
    sc.add_observer(recorder.clone());

    let sp = sc.build();
    sp.get_required::<u16>();
    sp.get_required::<u16>();
    assert_eq!(recorder.events.lock().unwrap().len(), 2);
}

#[test]
fn test_observer_sees_failures() {
    let recorder = Arc::new(Recorder::default());
    let mut sc = collection();
    sc.add_transient_factory::<u32, _>(|_| Err(DiError::factory("offline")));
    sc.add_observer(recorder.clone());

    assert!(sc.build().resolve::<u32>().is_err());
    let events = recorder.events.lock().unwrap();
    assert_eq!(events.as_slice(), ["resolving u32", "failed u32: true"]);
}

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[test]
fn test_logging_observer_emits_tracing_events() {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        let mut sc = collection();
        sc.add_transient_factory::<String, _>(|_| Ok("ok".to_string()));
        sc.add_transient_factory::<u8, _>(|_| Err(DiError::factory("broken")));
        sc.add_observer(Arc::new(LoggingObserver::with_label("orders")));

        let sp = sc.build();
        sp.get_required::<String>();
        assert!(sp.resolve::<u8>().is_err());
    });

    let output = capture.contents();
    assert!(output.contains("resolving"), "{}", output);
    assert!(output.contains("resolved"), "{}", output);
    assert!(output.contains("resolution failed"), "{}", output);
    assert!(output.contains("container=orders"), "{}", output);
    assert!(output.contains("WARN"), "{}", output);
}
