//! Integration tests for Paper Harvest
//!
//! These tests drive the real adapters against local mock servers, through the
//! orchestrator, deduplication and the output writers.

use mockito::{Matcher, Server, ServerGuard};
use paper_harvest::output::{write_outputs, LATEST_CSV_NAME};
use paper_harvest::pipeline::{FetchFailure, Orchestrator, OrchestratorConfig};
use paper_harvest::sources::{CrossrefSource, OpenAlexSource, PubMedSource, SourceRegistry};
use paper_harvest::utils::{deduplicate_records, HttpClient};
use paper_harvest::SourceKind;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const PUBMED_XML: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">38000001</PMID>
      <Article PubModel="Print">
        <Journal>
          <Title>Journal of Valves</Title>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2024</Year><Month>Mar</Month><Day>5</Day></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Transcatheter valve outcomes</ArticleTitle>
        <Abstract><AbstractText>Background text.</AbstractText></Abstract>
        <AuthorList>
          <Author><LastName>Doe</LastName><ForeName>Jane</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">38000001</ArticleId>
        <ArticleId IdType="doi">10.1/X</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

const CROSSREF_JSON: &str = r#"{
  "status": "ok",
  "message": {
    "items": [
      {
        "DOI": "10.1/X",
        "title": ["Transcatheter valve outcomes (Crossref copy)"],
        "author": [{"given": "Jane", "family": "Doe"}],
        "container-title": ["Journal of Valves"],
        "published-print": {"date-parts": [[2024, 3]]}
      }
    ]
  }
}"#;

const OPENALEX_JSON: &str = r#"{
  "results": [
    {
      "id": "https://openalex.org/W1",
      "doi": "https://doi.org/10.1/Y",
      "title": "Deep learning for echocardiography",
      "publication_date": "2023-11-20",
      "authorships": [{"author": {"display_name": "Ann Lee"}}],
      "primary_location": {"source": {"display_name": "Cardiac Imaging"}},
      "abstract_inverted_index": {"learning": [1], "Deep": [0], "works": [2]}
    }
  ]
}"#;

async fn pubmed_server() -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"esearchresult":{"idlist":["38000001"]}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::UrlEncoded("id".into(), "38000001".into()))
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(PUBMED_XML)
        .create_async()
        .await;
    server
}

async fn json_server(body: &'static str, status: usize) -> ServerGuard {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/works")
        .match_query(Matcher::Any)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await;
    server
}

fn registry(pubmed: &ServerGuard, crossref: &ServerGuard, openalex: &ServerGuard) -> SourceRegistry {
    let client = Arc::new(HttpClient::new().unwrap());
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(
        PubMedSource::new(Arc::clone(&client), 20).with_base_url(pubmed.url()),
    ));
    registry.register(Arc::new(
        CrossrefSource::new(Arc::clone(&client), 20).with_base_url(crossref.url()),
    ));
    registry.register(Arc::new(
        OpenAlexSource::new(client, 20).with_base_url(openalex.url()),
    ));
    registry
}

fn orchestrator_config() -> OrchestratorConfig {
    OrchestratorConfig {
        request_timeout: Duration::from_secs(10),
        max_concurrent_per_source: 2,
    }
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_end_to_end_dedup_across_sources() {
    let pubmed = pubmed_server().await;
    let crossref = json_server(CROSSREF_JSON, 200).await;
    let openalex = json_server(OPENALEX_JSON, 200).await;

    let orchestrator = Orchestrator::new(registry(&pubmed, &crossref, &openalex), orchestrator_config());
    let report = orchestrator
        .run(&list(&["pubmed", "crossref", "openalex"]), &list(&["valves"]))
        .await;

    assert_eq!(report.records.len(), 3);
    assert!(report.failures.is_empty());

    let records = deduplicate_records(report.records);
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].source(), SourceKind::PubMed);
    assert_eq!(records[0].doi(), "10.1/x");
    assert_eq!(records[0].title(), "Transcatheter valve outcomes");
    assert_eq!(records[0].publication_date(), "2024-03-05");
    assert_eq!(records[0].journal(), "Journal of Valves");

    assert_eq!(records[1].source(), SourceKind::OpenAlex);
    assert_eq!(records[1].doi(), "10.1/y");
    assert_eq!(records[1].abstract_text(), "Deep learning works");
    assert_eq!(records[1].authors_joined(), "Ann Lee");
}

#[tokio::test]
async fn test_failing_source_does_not_affect_others() {
    let pubmed = pubmed_server().await;
    let crossref = json_server("", 500).await;
    let openalex = json_server(OPENALEX_JSON, 200).await;

    let orchestrator = Orchestrator::new(registry(&pubmed, &crossref, &openalex), orchestrator_config());
    let report = orchestrator
        .run(&list(&["pubmed", "crossref", "openalex"]), &list(&["valves"]))
        .await;

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].source(), SourceKind::PubMed);
    assert_eq!(report.records[1].source(), SourceKind::OpenAlex);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, SourceKind::Crossref);
    assert!(matches!(report.failures[0].failure, FetchFailure::Source(_)));
}

#[tokio::test]
async fn test_malformed_payload_yields_no_records() {
    let pubmed = pubmed_server().await;
    let crossref = json_server("{not json", 200).await;
    let openalex = json_server(OPENALEX_JSON, 200).await;

    let orchestrator = Orchestrator::new(registry(&pubmed, &crossref, &openalex), orchestrator_config());
    let report = orchestrator
        .run(&list(&["crossref", "openalex"]), &list(&["valves"]))
        .await;

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.units_succeeded, 1);
}

#[tokio::test]
async fn test_unknown_source_skipped_end_to_end() {
    let pubmed = pubmed_server().await;
    let crossref = json_server(CROSSREF_JSON, 200).await;
    let openalex = json_server(OPENALEX_JSON, 200).await;

    let orchestrator = Orchestrator::new(registry(&pubmed, &crossref, &openalex), orchestrator_config());
    let report = orchestrator
        .run(&list(&["scopus", "OpenAlex"]), &list(&["valves"]))
        .await;

    assert_eq!(report.skipped_sources, vec!["scopus"]);
    assert_eq!(report.records.len(), 1);
}

#[tokio::test]
async fn test_pipeline_writes_outputs() {
    let pubmed = pubmed_server().await;
    let crossref = json_server(CROSSREF_JSON, 200).await;
    let openalex = json_server(OPENALEX_JSON, 200).await;

    let orchestrator = Orchestrator::new(registry(&pubmed, &crossref, &openalex), orchestrator_config());
    let report = orchestrator
        .run(&list(&["pubmed", "crossref", "openalex"]), &list(&["valves"]))
        .await;
    let records = deduplicate_records(report.records);

    let dir = TempDir::new().unwrap();
    let files = write_outputs(&records, dir.path(), "20240101_000000", "Literature Summary").unwrap();

    let mut reader = csv::Reader::from_path(&files.csv).unwrap();
    assert_eq!(reader.records().count(), 2);
    assert!(dir.path().join(LATEST_CSV_NAME).exists());

    let summary = std::fs::read_to_string(&files.summary).unwrap();
    assert!(summary.starts_with("# Literature Summary (20240101_000000)"));
    assert!(summary.contains("https://doi.org/10.1/x"));
    assert!(summary.contains("https://doi.org/10.1/y"));
}
