use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use section_patcher::models::SectionPattern;
use section_patcher::services::{InMemoryReferenceStore, PlaceholderFiller};
use section_patcher::{
    BatchScheduler, BlockNode, BoundaryCache, Document, EditRequest, FailureReason, FillRequest,
    GenerationClient, GenerationError, RetryPolicy, SectionEditor, SectionFlow, SectionRegistry,
    SectionResolver,
};

/// 按 prompt 中的章节名返回预设结果
#[derive(Default)]
struct RoutedClient {
    routes: Mutex<HashMap<String, VecDeque<Result<String, GenerationError>>>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl RoutedClient {
    fn route(self, section: &str, script: Vec<Result<String, GenerationError>>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(section.to_string(), script.into());
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationClient for RoutedClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut routes = self.routes.lock().unwrap();
        let script = routes
            .iter_mut()
            .find(|(section, _)| prompt.contains(&format!("\"{}\" section", section)))
            .map(|(_, script)| script);
        match script.and_then(|s| s.pop_front()) {
            Some(result) => result,
            None => Err(GenerationError::fatal("没有预设结果")),
        }
    }
}

fn pattern(text: &str) -> SectionPattern {
    SectionPattern {
        substrings: vec![text.to_string()],
        expected_level: None,
    }
}

fn registry() -> Arc<SectionRegistry> {
    Arc::new(
        SectionRegistry::from_patterns([
            ("A".to_string(), pattern("Alpha")),
            ("B".to_string(), pattern("Bravo")),
            ("C".to_string(), pattern("Charlie")),
            ("Nonexistent Section".to_string(), pattern("Nowhere")),
        ])
        .unwrap(),
    )
}

/// A[0,5) B[5,12) C[12,20)
fn three_sections() -> Document {
    let mut content = Vec::new();
    for (title, len) in [("Alpha", 5), ("Bravo", 7), ("Charlie", 8)] {
        content.push(BlockNode::heading(1, title));
        for i in 1..len {
            content.push(BlockNode::paragraph(format!("{} body {}", title, i)));
        }
    }
    Document::new(content)
}

fn four_nodes_json() -> String {
    json!([
        { "type": "heading", "attrs": { "level": 1 }, "content": [{ "type": "text", "text": "Bravo" }] },
        { "type": "paragraph", "content": [{ "type": "text", "text": "rewritten 1" }] },
        { "type": "bulletList", "content": [
            { "type": "listItem", "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "point" }] }] }
        ] },
        { "type": "paragraph", "content": [{ "type": "text", "text": "rewritten 2", "marks": [{ "type": "bold" }] }] }
    ])
    .to_string()
}

fn editor(client: Arc<RoutedClient>, resolver: SectionResolver) -> SectionEditor {
    let flow = SectionFlow::new(
        client,
        RetryPolicy::default(),
        PlaceholderFiller::new("Country").unwrap(),
    );
    SectionEditor::new(resolver, flow, BatchScheduler::new(2, Duration::ZERO))
}

fn edit(sections: &[&str]) -> EditRequest {
    EditRequest {
        document: three_sections(),
        sections: sections.iter().map(|s| s.to_string()).collect(),
        edit_instructions: "Rewrite the section".to_string(),
    }
}

#[tokio::test]
async fn test_edit_middle_section_preserves_neighbours() {
    let client = Arc::new(RoutedClient::default().route("B", vec![Ok(four_nodes_json())]));
    let base = three_sections();

    let response = editor(client, SectionResolver::new(registry()))
        .edit(edit(&["B"]))
        .await
        .unwrap();

    let doc = &response.document;
    assert_eq!(doc.len(), 5 + 4 + 8);
    assert_eq!(doc.content[..5], base.content[..5]);
    assert_eq!(doc.content[9..17], base.content[12..20]);
    assert_eq!(doc.content[5].text_content(), "Bravo");
    assert_eq!(response.successful_sections, vec!["B"]);
    assert!(response.failed_sections.is_empty());
    assert_eq!(response.title, "Alpha");
}

#[tokio::test]
async fn test_missing_section_leaves_document_identical() {
    let client = Arc::new(RoutedClient::default());

    let response = editor(client.clone(), SectionResolver::new(registry()))
        .edit(edit(&["Nonexistent Section"]))
        .await
        .unwrap();

    let outcome = &response.outcomes[0];
    assert!(!outcome.success);
    assert_eq!(outcome.nodes, None);
    assert_eq!(outcome.failure, Some(FailureReason::NotFound));
    assert_eq!(
        serde_json::to_string(&response.document).unwrap(),
        serde_json::to_string(&three_sections()).unwrap()
    );
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn test_failed_section_does_not_block_siblings() {
    let client = Arc::new(
        RoutedClient::default()
            .route("A", vec![Err(GenerationError::fatal("bad request"))])
            .route("C", vec![Ok(format!("```json\n{}\n```", four_nodes_json()))]),
    );
    let base = three_sections();

    let response = editor(client, SectionResolver::new(registry()))
        .edit(edit(&["A", "B", "C"]))
        .await
        .unwrap();

    let doc = &response.document;
    // A 与 B 保持原样，C 由 8 个节点变为 4 个
    assert_eq!(doc.len(), 5 + 7 + 4);
    assert_eq!(doc.content[..12], base.content[..12]);
    assert_eq!(response.successful_sections, vec!["C"]);
    assert_eq!(response.failed_sections, vec!["A", "B"]);

    let names: Vec<_> = response.outcomes.iter().map(|o| o.section_name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    // 降级的章节返回原始范围
    assert_eq!(response.outcomes[0].nodes.as_deref(), Some(&base.content[0..5]));
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion_keeps_original_section() {
    let client = Arc::new(RoutedClient::default().route(
        "B",
        (0..5)
            .map(|_| Err(GenerationError::rate_limited("Rate limit reached for requests")))
            .collect(),
    ));
    let started = tokio::time::Instant::now();

    let response = editor(client.clone(), SectionResolver::new(registry()))
        .edit(edit(&["B"]))
        .await
        .unwrap();

    let outcome = &response.outcomes[0];
    assert!(!outcome.success);
    assert_eq!(outcome.attempts, 5);
    assert_eq!(outcome.nodes.as_deref(), Some(&three_sections().content[5..12]));
    assert_eq!(response.document, three_sections());
    assert_eq!(client.calls(), 5);
    assert_eq!(started.elapsed(), Duration::from_secs(1 + 2 + 4 + 8));
}

#[tokio::test]
async fn test_truncated_output_is_recovered() {
    let mut truncated = four_nodes_json();
    truncated.truncate(truncated.len() - 2);
    let client = Arc::new(RoutedClient::default().route("B", vec![Ok(truncated)]));

    let response = editor(client, SectionResolver::new(registry()))
        .edit(edit(&["B"]))
        .await
        .unwrap();

    let outcome = &response.outcomes[0];
    assert!(outcome.success);
    assert_eq!(
        outcome.recovery_stage,
        Some(section_patcher::services::RecoveryStage::Repaired)
    );
    assert_eq!(response.document.len(), 17);
}

#[tokio::test]
async fn test_stale_boundary_cache_falls_back_to_locator() {
    let registry = registry();
    let cache = BoundaryCache::build(&three_sections(), &registry);

    // 模板多了一个节点，缓存指纹不再匹配
    let mut request = edit(&["C"]);
    request.document.content.insert(0, BlockNode::paragraph("preface"));

    let client = Arc::new(RoutedClient::default().route("C", vec![Ok(four_nodes_json())]));
    let resolver = SectionResolver::new(registry).with_cache(cache);
    let response = editor(client, resolver).edit(request).await.unwrap();

    assert!(response.outcomes[0].success);
    assert_eq!(response.outcomes[0].range.map(|r| (r.start, r.end)), Some((13, 21)));
    assert_eq!(response.document.len(), 21 - 8 + 4);
}

#[tokio::test]
async fn test_fill_uses_reference_material_and_subject() {
    let fill_nodes = json!([
        { "type": "heading", "attrs": { "level": 1 }, "content": [{ "type": "text", "text": "Bravo for [Country]" }] }
    ])
    .to_string();
    let client = Arc::new(RoutedClient::default().route("B", vec![Ok(fill_nodes)]));

    let mut store = InMemoryReferenceStore::new();
    store.insert(
        "Kenya",
        json!({ "sections": [{ "name": "B", "documents": [{ "doc_type": "BTR", "extracted_text": "Kenya submitted its first BTR." }] }] }),
    );

    let response = editor(client.clone(), SectionResolver::new(registry()))
        .with_reference_store(Arc::new(store))
        .fill(FillRequest {
            document: three_sections(),
            sections: vec!["B".to_string()],
            subject: " Kenya ".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.document.content[5].text_content(), "Bravo for Kenya");
    assert_eq!(response.document.len(), 5 + 1 + 8);

    let prompts = client.prompts.lock().unwrap();
    assert!(prompts[0].contains("[BTR]\nKenya submitted its first BTR."));
    assert!(prompts[0].contains("accurately for Kenya"));
}
