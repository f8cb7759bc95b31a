use super::*;
use crate::{request::RequestDescriptorBuilder, FragmentInstance, ViewHost};
use async_trait::async_trait;
use serde_json::json;
use shared::{
    error::ErrorCode,
    query::{Filter, FilterOperator, Sorter, UrlParameters},
};
use std::sync::Mutex;

type EventLog = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone, PartialEq)]
enum ServiceCall {
    Read {
        path: String,
        options: ReadOptions,
    },
    Create {
        path: String,
        payload: Record,
        options: WriteOptions,
    },
    Update {
        path: String,
        payload: Record,
        options: WriteOptions,
    },
    Remove {
        path: String,
        options: WriteOptions,
    },
}

struct TestDataService {
    result: Result<Record, DataServiceError>,
    calls: Mutex<Vec<ServiceCall>>,
    events: EventLog,
}

impl TestDataService {
    fn ok(result: Record, events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(result),
            calls: Mutex::new(Vec::new()),
            events,
        })
    }

    fn failing(err: DataServiceError, events: EventLog) -> Arc<Self> {
        Arc::new(Self {
            result: Err(err),
            calls: Mutex::new(Vec::new()),
            events,
        })
    }

    fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().expect("calls").clone()
    }

    fn settle(&self, call: ServiceCall) -> Result<Record, DataServiceError> {
        self.events.lock().expect("events").push("call".into());
        self.calls.lock().expect("calls").push(call);
        self.result.clone()
    }
}

#[async_trait]
impl crate::DataServiceClient for TestDataService {
    async fn read(&self, path: &str, options: ReadOptions) -> Result<Record, DataServiceError> {
        self.settle(ServiceCall::Read {
            path: path.into(),
            options,
        })
    }

    async fn create(
        &self,
        path: &str,
        payload: Record,
        options: WriteOptions,
    ) -> Result<Record, DataServiceError> {
        self.settle(ServiceCall::Create {
            path: path.into(),
            payload,
            options,
        })
    }

    async fn update(
        &self,
        path: &str,
        payload: Record,
        options: WriteOptions,
    ) -> Result<Record, DataServiceError> {
        self.settle(ServiceCall::Update {
            path: path.into(),
            payload,
            options,
        })
    }

    async fn remove(&self, path: &str, options: WriteOptions) -> Result<Record, DataServiceError> {
        self.settle(ServiceCall::Remove {
            path: path.into(),
            options,
        })
    }
}

struct TestView;

impl ViewHost for TestView {
    fn controller_name(&self) -> &str {
        "app.controller.Orders"
    }

    fn add_dependent(&self, _fragment: Arc<dyn FragmentInstance>) {}

    fn remove_dependent(&self, _fragment_id: &str) {}
}

#[derive(Default)]
struct RecordingNotifier {
    errors: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingNotifier {
    fn errors(&self) -> Vec<(String, Option<String>)> {
        self.errors.lock().expect("errors").clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn show_error(&self, message: &str, detail: Option<&str>) {
        self.errors
            .lock()
            .expect("errors")
            .push((message.to_string(), detail.map(str::to_string)));
    }

    fn show_success(&self, _message: &str, _detail: Option<&str>) {}

    fn show_warning(&self, _message: &str, _detail: Option<&str>) {}
}

struct RecordingBusy {
    events: EventLog,
}

impl BusyIndicator for RecordingBusy {
    fn show(&self) {
        self.events.lock().expect("events").push("show".into());
    }

    fn hide(&self) {
        self.events.lock().expect("events").push("hide".into());
    }
}

struct Harness {
    events: EventLog,
    notifier: Arc<RecordingNotifier>,
    received: Arc<Mutex<Vec<(String, Record)>>>,
    orchestrator: RequestOrchestrator,
}

impl Harness {
    fn new() -> Self {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let notifier = Arc::new(RecordingNotifier::default());
        let busy = Arc::new(RecordingBusy {
            events: events.clone(),
        });
        Self {
            events,
            orchestrator: RequestOrchestrator::new(notifier.clone(), busy),
            notifier,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn descriptor(
        &self,
        service: Arc<TestDataService>,
        entity_set: &str,
    ) -> RequestDescriptorBuilder {
        let received = self.received.clone();
        let events = self.events.clone();
        RequestDescriptor::builder()
            .service(service)
            .entity_set(entity_set)
            .view(Arc::new(TestView))
            .on_success(move |view, record| {
                events.lock().expect("events").push("callback".into());
                received
                    .lock()
                    .expect("received")
                    .push((view.controller_name().to_string(), record));
            })
    }

    fn received(&self) -> Vec<(String, Record)> {
        self.received.lock().expect("received").clone()
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().expect("events").clone()
    }
}

fn timeout_error() -> DataServiceError {
    DataServiceError::new(ErrorCode::Timeout, "timeout").with_response_text("gateway timed out")
}

#[tokio::test]
async fn create_posts_payload_to_prefixed_path_and_hands_back_server_record() {
    let mut harness = Harness::new();
    let server_record = json!({"id": 17, "name": "X"});
    let service = TestDataService::ok(server_record.clone(), harness.events.clone());
    let descriptor = harness
        .descriptor(service.clone(), "Orders")
        .payload(json!({"name": "X"}))
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let outcome = harness.orchestrator.execute(OperationKind::Create).await;

    assert_eq!(outcome, RequestOutcome::Completed(server_record.clone()));
    assert_eq!(
        service.calls(),
        vec![ServiceCall::Create {
            path: "/Orders".into(),
            payload: json!({"name": "X"}),
            options: WriteOptions {
                url_parameters: UrlParameters::new(),
                refresh_after_change: true,
            },
        }]
    );
    assert_eq!(
        harness.received(),
        vec![("app.controller.Orders".to_string(), server_record)]
    );
    assert!(harness.notifier.errors().is_empty());
}

#[tokio::test]
async fn read_passes_filters_and_delivers_result_set_verbatim() {
    let mut harness = Harness::new();
    let result_set = json!({"results": [{"CustomerID": "C1", "Status": "Active"}]});
    let service = TestDataService::ok(result_set.clone(), harness.events.clone());
    let status_filter = Filter::new("Status", FilterOperator::Eq, "Active");
    let descriptor = harness
        .descriptor(service.clone(), "Customers")
        .filter(status_filter.clone())
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let outcome = harness.orchestrator.execute(OperationKind::Read).await;

    assert_eq!(outcome.record(), Some(&result_set));
    assert_eq!(
        service.calls(),
        vec![ServiceCall::Read {
            path: "/Customers".into(),
            options: ReadOptions {
                filters: vec![status_filter],
                sorters: Vec::new(),
                url_parameters: UrlParameters::new(),
            },
        }]
    );
    assert_eq!(harness.received()[0].1, result_set);
}

#[tokio::test]
async fn unknown_operation_kind_is_reported_once_and_never_reaches_service() {
    let mut harness = Harness::new();
    let service = TestDataService::ok(json!({}), harness.events.clone());
    let descriptor = harness
        .descriptor(service.clone(), "Orders")
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let outcome = harness.orchestrator.execute_named("bogus").await;

    assert_eq!(
        outcome,
        RequestOutcome::Rejected(RequestDescriptorError::MissingOperationKind("bogus".into()))
    );
    assert!(service.calls().is_empty());
    let errors = harness.notifier.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].0.contains("operation kind must be supplied"));
    assert!(harness.events().is_empty(), "busy indicator must stay hidden");
    assert!(harness.received().is_empty());
}

#[tokio::test]
async fn failing_read_reports_message_and_detail_without_invoking_callback() {
    let mut harness = Harness::new();
    let service = TestDataService::failing(timeout_error(), harness.events.clone());
    let descriptor = harness
        .descriptor(service.clone(), "Customers")
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let outcome = harness.orchestrator.execute(OperationKind::Read).await;

    assert_eq!(outcome, RequestOutcome::Failed(timeout_error()));
    assert_eq!(
        harness.notifier.errors(),
        vec![("timeout".to_string(), Some("gateway timed out".to_string()))]
    );
    assert!(harness.received().is_empty());
}

#[tokio::test]
async fn busy_indicator_brackets_every_kind_on_success_and_failure() {
    let kinds = [
        OperationKind::Read,
        OperationKind::Create,
        OperationKind::Update,
        OperationKind::Delete,
    ];

    for kind in kinds {
        for fail in [false, true] {
            let mut harness = Harness::new();
            let service = if fail {
                TestDataService::failing(timeout_error(), harness.events.clone())
            } else {
                TestDataService::ok(json!({"ok": true}), harness.events.clone())
            };
            let descriptor = harness
                .descriptor(service, "Orders('1')")
                .payload(json!({"name": "Y"}))
                .build()
                .expect("descriptor");
            harness.orchestrator.configure(descriptor);

            harness.orchestrator.execute(kind).await;

            let events = harness.events();
            let tail = if fail { None } else { Some("callback") };
            let mut expected = vec!["show", "call", "hide"];
            expected.extend(tail);
            assert_eq!(events, expected, "kind={kind} fail={fail}");
        }
    }
}

#[tokio::test]
async fn supplied_options_become_url_parameters_even_when_zero() {
    let mut harness = Harness::new();
    let service = TestDataService::ok(json!({"results": []}), harness.events.clone());
    let descriptor = harness
        .descriptor(service.clone(), "Orders")
        .select("OrderID,Status")
        .top(0)
        .skip(0)
        .sorter(Sorter::descending("CreatedAt"))
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let parameters = harness.orchestrator.parameters().expect("configured");
    assert_eq!(parameters.entity_path(), "/Orders");
    assert_eq!(parameters.controller_name(), "app.controller.Orders");
    assert_eq!(parameters.url_parameters().get("$select"), Some("OrderID,Status"));
    assert_eq!(parameters.url_parameters().get("$top"), Some("0"));
    assert_eq!(parameters.url_parameters().get("$skip"), Some("0"));
    assert!(!parameters.url_parameters().contains("$expand"));
    assert_eq!(parameters.sorters(), &[Sorter::descending("CreatedAt")]);
    assert!(parameters.filters().is_empty());

    harness.orchestrator.execute(OperationKind::Read).await;
    let ServiceCall::Read { options, .. } = &service.calls()[0] else {
        panic!("expected read");
    };
    assert_eq!(options.url_parameters.len(), 3);
}

#[tokio::test]
async fn delete_forwards_url_parameters_and_resolves_empty_result() {
    let mut harness = Harness::new();
    let service = TestDataService::ok(Record::Null, harness.events.clone());
    let descriptor = harness
        .descriptor(service.clone(), "Orders('A1')")
        .expand("Items")
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let outcome = harness.orchestrator.execute(OperationKind::Delete).await;

    assert_eq!(outcome, RequestOutcome::Completed(Record::Null));
    let ServiceCall::Remove { path, options } = &service.calls()[0] else {
        panic!("expected remove");
    };
    assert_eq!(path, "/Orders('A1')");
    assert_eq!(options.url_parameters.get("$expand"), Some("Items"));
    assert!(options.refresh_after_change);
    assert_eq!(harness.received()[0].1, Record::Null);
}

#[tokio::test]
async fn write_without_payload_is_rejected_before_any_call() {
    let mut harness = Harness::new();
    let service = TestDataService::ok(json!({}), harness.events.clone());
    let descriptor = harness
        .descriptor(service.clone(), "Orders")
        .build()
        .expect("descriptor");

    harness.orchestrator.configure(descriptor);
    let outcome = harness.orchestrator.execute(OperationKind::Update).await;

    assert_eq!(
        outcome,
        RequestOutcome::Rejected(RequestDescriptorError::MissingPayload(OperationKind::Update))
    );
    assert!(service.calls().is_empty());
    assert_eq!(harness.notifier.errors().len(), 1);
}

#[tokio::test]
async fn execute_before_configure_is_reported() {
    let mut harness = Harness::new();
    let outcome = harness.orchestrator.execute(OperationKind::Read).await;

    assert_eq!(
        outcome,
        RequestOutcome::Rejected(RequestDescriptorError::NotConfigured)
    );
    assert_eq!(harness.notifier.errors().len(), 1);
    assert!(harness.events().is_empty());
}

#[test]
fn descriptor_without_success_callback_is_rejected_at_build() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let err = RequestDescriptor::builder()
        .service(TestDataService::ok(json!({}), events))
        .entity_set("Orders")
        .view(Arc::new(TestView))
        .build()
        .expect_err("callback is mandatory");
    assert_eq!(err, RequestDescriptorError::MissingField("on_success"));
}

#[tokio::test]
async fn reconfiguring_runs_a_fresh_busy_cycle() {
    let mut harness = Harness::new();
    let service = TestDataService::ok(json!({"results": []}), harness.events.clone());

    for entity_set in ["Orders", "Customers"] {
        let descriptor = harness
            .descriptor(service.clone(), entity_set)
            .build()
            .expect("descriptor");
        harness.orchestrator.configure(descriptor);
        harness.orchestrator.execute(OperationKind::Read).await;
    }

    let shows = harness.events().iter().filter(|e| *e == "show").count();
    let hides = harness.events().iter().filter(|e| *e == "hide").count();
    assert_eq!((shows, hides), (2, 2));
    let paths: Vec<String> = service
        .calls()
        .into_iter()
        .map(|call| match call {
            ServiceCall::Read { path, .. } => path,
            other => panic!("unexpected call {other:?}"),
        })
        .collect();
    assert_eq!(paths, vec!["/Orders", "/Customers"]);
}

#[tokio::test]
async fn settings_can_disable_refresh_after_change() {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let notifier = Arc::new(RecordingNotifier::default());
    let busy = Arc::new(RecordingBusy {
        events: events.clone(),
    });
    let settings = Settings {
        refresh_after_change: false,
        ..Settings::default()
    };
    let mut orchestrator = RequestOrchestrator::with_settings(notifier, busy, &settings);
    let service = TestDataService::ok(json!({"id": 1}), events);
    let descriptor = RequestDescriptor::builder()
        .service(service.clone())
        .entity_set("Orders")
        .view(Arc::new(TestView))
        .on_success(|_, _| {})
        .payload(json!({"id": 1}))
        .build()
        .expect("descriptor");

    orchestrator.configure(descriptor);
    orchestrator.execute(OperationKind::Create).await;

    let ServiceCall::Create { options, .. } = &service.calls()[0] else {
        panic!("expected create");
    };
    assert!(!options.refresh_after_change);
}
