mod common;

use std::sync::Arc;

use common::{MockMappingService, mapping_response};
use mdspec::convert::Converter;
use mdspec::error::ConvertError;
use mdspec::progress::{CancelToken, Phase, ProgressEvent};

fn collect_events(
    converter: &Converter,
    text: &str,
    format: &str,
    cancel: &CancelToken,
) -> (Result<(), ConvertError>, Vec<ProgressEvent>) {
    let mut events = Vec::new();
    let result = converter
        .convert_streaming(text, "", format, cancel, &mut |event| events.push(event))
        .map(|_| ());
    (result, events)
}

#[test]
fn tabular_input_emits_all_four_phases_in_order() {
    let mock = Arc::new(MockMappingService::with_response(mapping_response(&[
        ("id", 0, 0.9),
        ("title", 1, 0.9),
    ])));
    let converter = Converter::new().with_ai_service(mock);
    let (result, events) = collect_events(
        &converter,
        "ID\tTitle\n1\tLogin\n2\tLogout",
        "spec",
        &CancelToken::new(),
    );

    result.expect("conversion");
    let phases: Vec<Phase> = events.iter().map(|event| event.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::Parsing, Phase::Mapping, Phase::Rendering, Phase::Complete]
    );
    let percents: Vec<u8> = events.iter().map(|event| event.percent).collect();
    assert_eq!(percents, vec![20, 50, 80, 100]);
}

#[test]
fn markdown_input_skips_the_mapping_phase() {
    let converter = Converter::new();
    let (result, events) = collect_events(
        &converter,
        "# Already Markdown\n\n- item one\n- item two",
        "",
        &CancelToken::new(),
    );

    result.expect("conversion");
    let phases: Vec<Phase> = events.iter().map(|event| event.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::Parsing, Phase::Rendering, Phase::Complete]
    );
}

#[test]
fn percent_is_monotone_and_complete_is_unique() {
    let converter = Converter::new();
    let (result, events) = collect_events(
        &converter,
        "ID\tStatus\n1\topen\n2\tdone",
        "table",
        &CancelToken::new(),
    );

    result.expect("conversion");
    for pair in events.windows(2) {
        assert!(pair[0].percent <= pair[1].percent);
    }
    let completes = events
        .iter()
        .filter(|event| event.phase == Phase::Complete)
        .count();
    assert_eq!(completes, 1);
}

#[test]
fn pre_cancelled_conversions_emit_nothing() {
    let converter = Converter::new();
    let cancel = CancelToken::new();
    cancel.cancel();
    let (result, events) = collect_events(&converter, "ID\tTitle\n1\tx", "spec", &cancel);

    assert!(matches!(result, Err(ConvertError::Cancelled)));
    assert!(events.is_empty());
}

#[test]
fn cancellation_during_the_ai_call_suppresses_complete() {
    struct CancellingService(CancelToken);

    impl mdspec::ai::ColumnMappingService for CancellingService {
        fn map_columns(
            &self,
            _cancel: &CancelToken,
            _request: &mdspec::ai::MapColumnsRequest,
        ) -> Result<mdspec::ai::MapColumnsResponse, mdspec::error::AiError> {
            // Simulates a timeout firing while the request is in flight.
            self.0.cancel();
            Err(mdspec::error::AiError::Cancelled)
        }

        fn mode(&self) -> mdspec::ai::AiMode {
            mdspec::ai::AiMode::On
        }

        fn model(&self) -> String {
            "cancelling".to_string()
        }
    }

    let cancel = CancelToken::new();
    let converter =
        Converter::new().with_ai_service(Arc::new(CancellingService(cancel.clone())));
    let (result, events) = collect_events(&converter, "ID\tTitle\n1\tx\n2\ty", "spec", &cancel);

    assert!(matches!(result, Err(ConvertError::Cancelled)));
    assert!(events
        .iter()
        .all(|event| event.phase != Phase::Complete));
}
