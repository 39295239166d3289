//! Question answering over the indexed court opinion.
//!
//! Every question runs the full pipeline: make sure the PDF is on disk,
//! extract its pages, wipe the vector table, re-embed the document (when
//! enabled), then retrieve context and ask the model. Rebuilding the index
//! per question keeps the store consistent with the source file at the cost
//! of latency on every request.

use crate::chunker::Chunker;
use crate::config::DocumentConfig;
use crate::embeddings::Embedder;
use crate::errors::AppError;
use crate::fetch::DocumentFetcher;
use crate::llm::AnswerModel;
use crate::metrics;
use crate::pdf;
use crate::store::{ChunkRecord, ScoredChunk, VectorStore};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Questions probing the assistant's identity get a fixed reply instead of
/// a retrieval round trip.
const IDENTITY_PROBE: &str = "your name";
const IDENTITY_REPLY: &str = "Hello, I'm ChatGPT!";

pub struct AnswerService {
    fetcher: DocumentFetcher,
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn AnswerModel>,
    store: Arc<dyn VectorStore>,
    process_pdf: bool,
    top_k: usize,
}

impl AnswerService {
    pub fn new(
        fetcher: DocumentFetcher,
        chunker: Chunker,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn AnswerModel>,
        store: Arc<dyn VectorStore>,
        config: &DocumentConfig,
    ) -> Self {
        Self {
            fetcher,
            chunker,
            embedder,
            model,
            store,
            process_pdf: config.process_pdf,
            top_k: config.top_k,
        }
    }

    /// Answer a single question, rebuilding the index first.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn answer(&self, question: &str) -> Result<String, AppError> {
        let start = Instant::now();
        match self.run_pipeline(question).await {
            Ok(answer) => {
                let outcome = if is_identity_probe(question) {
                    "greeting"
                } else {
                    "answered"
                };
                metrics::record_question(start.elapsed().as_secs_f64(), outcome);
                Ok(answer)
            }
            Err(e) => {
                metrics::record_question(start.elapsed().as_secs_f64(), "error");
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self, question: &str) -> Result<String, AppError> {
        // The index is rebuilt before the question is even looked at,
        // identity probes included.
        self.rebuild_index().await?;

        if is_identity_probe(question) {
            debug!("Identity probe, returning the fixed reply");
            return Ok(IDENTITY_REPLY.to_string());
        }

        let query_embedding = self.embedder.embed(question).await?;
        let chunks = self
            .store
            .similarity_search(&query_embedding, self.top_k)
            .await?;
        debug!(retrieved = chunks.len(), "Retrieved context chunks");
        for chunk in &chunks {
            debug!(
                page = chunk.page,
                chunk_index = chunk.chunk_index,
                score = chunk.score,
                "Context chunk"
            );
        }

        let prompt = build_prompt(&chunks, question);
        let completion = self.model.complete(&prompt).await;
        metrics::record_model_request(self.model.model_name(), completion.is_ok());

        Ok(completion?.trim().to_string())
    }

    /// Fetch, extract, clear, and (when enabled) repopulate the vector table.
    async fn rebuild_index(&self) -> Result<(), AppError> {
        let start = Instant::now();

        let path = self.fetcher.ensure_local().await?.to_path_buf();

        let pages = tokio::task::spawn_blocking(move || pdf::extract_pages(&path))
            .await
            .map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("PDF extraction task failed: {}", e))
            })??;

        // The table is emptied even when document processing is disabled.
        self.store.clear().await?;

        if !self.process_pdf {
            debug!("Document processing disabled, index left empty");
            return Ok(());
        }

        let mut total_chunks = 0;
        for page in &pages {
            let chunks = self.chunker.split(&page.text);
            if chunks.is_empty() {
                continue;
            }

            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embed_start = Instant::now();
            let embeddings = self.embedder.embed_batch(&texts).await;
            metrics::record_embedding(
                embed_start.elapsed().as_secs_f64(),
                self.embedder.model_name(),
                embeddings.is_ok(),
            );
            let embeddings = embeddings?;

            let records: Vec<ChunkRecord> = chunks
                .into_iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| ChunkRecord {
                    page: page.number as i32,
                    chunk_index: chunk.index,
                    content: chunk.content,
                    embedding,
                })
                .collect();

            self.store.add_chunks(&records).await?;
            total_chunks += records.len();
        }

        metrics::record_reindex(start.elapsed().as_secs_f64(), total_chunks);
        info!(
            pages = pages.len(),
            chunks = total_chunks,
            elapsed_ms = start.elapsed().as_millis(),
            "Index rebuilt"
        );
        Ok(())
    }
}

/// True when the question asks about the assistant itself.
fn is_identity_probe(question: &str) -> bool {
    question.to_lowercase().contains(IDENTITY_PROBE)
}

/// Stuff the retrieved chunks into the question-answering prompt.
fn build_prompt(chunks: &[ScoredChunk], question: &str) -> String {
    let context = chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try \
         to make up an answer.\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{InMemoryStore, StoreEvent};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StaticEmbedder;

    #[async_trait]
    impl Embedder for StaticEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AppError> {
            Ok(vec![1.0, 0.0, 0.0])
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect())
        }

        fn model_name(&self) -> &str {
            "static-test"
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
        reply: String,
    }

    impl RecordingModel {
        fn new(reply: &str) -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                reply: reply.to_string(),
            }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AnswerModel for RecordingModel {
        async fn complete(&self, prompt: &str) -> Result<String, AppError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn test_service(
        dir: &TempDir,
        process_pdf: bool,
        model: Arc<RecordingModel>,
        store: Arc<InMemoryStore>,
    ) -> AnswerService {
        let pdf_path = dir.path().join("case.pdf");
        pdf::write_sample_pdf(
            &pdf_path,
            &[
                "The defendant Microsoft appealed the judgment of the district court.",
                "The court of appeals affirmed the award of damages to McCall.",
            ],
        );
        let config = DocumentConfig {
            url: "http://unused.invalid/case.pdf".to_string(),
            filename: "case.pdf".to_string(),
            data_dir: dir.path().to_string_lossy().to_string(),
            process_pdf,
            chunk_size: 250,
            chunk_overlap: 120,
            top_k: 4,
        };
        let fetcher = DocumentFetcher::new(&config).unwrap();
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap).unwrap();
        AnswerService::new(fetcher, chunker, Arc::new(StaticEmbedder), model, store, &config)
    }

    #[tokio::test]
    async fn test_clear_runs_before_add() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(RecordingModel::new("The judgment was affirmed."));
        let store = Arc::new(InMemoryStore::new());
        let service = test_service(&dir, true, model.clone(), store.clone());

        let answer = service.answer("Who won the appeal?").await.unwrap();

        assert_eq!(answer, "The judgment was affirmed.");
        let events = store.events();
        assert_eq!(events[0], StoreEvent::Cleared);
        assert!(events
            .iter()
            .any(|e| matches!(e, StoreEvent::Added(n) if *n > 0)));
        assert_eq!(*events.last().unwrap(), StoreEvent::Searched);
    }

    #[tokio::test]
    async fn test_identity_probe_skips_retrieval_but_still_reindexes() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(RecordingModel::new("unused"));
        let store = Arc::new(InMemoryStore::new());
        let service = test_service(&dir, true, model.clone(), store.clone());

        let answer = service.answer("What is YOUR NAME?").await.unwrap();

        assert_eq!(answer, "Hello, I'm ChatGPT!");
        assert!(model.prompts().is_empty());
        let events = store.events();
        assert_eq!(events[0], StoreEvent::Cleared);
        assert!(events.iter().any(|e| matches!(e, StoreEvent::Added(_))));
        assert!(!events.contains(&StoreEvent::Searched));
    }

    #[tokio::test]
    async fn test_processing_disabled_leaves_index_empty() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(RecordingModel::new("I don't know."));
        let store = Arc::new(InMemoryStore::new());
        let service = test_service(&dir, false, model.clone(), store.clone());

        let answer = service.answer("What were the damages?").await.unwrap();

        assert_eq!(answer, "I don't know.");
        assert_eq!(store.row_count(), 0);
        assert_eq!(store.events(), vec![StoreEvent::Cleared, StoreEvent::Searched]);
    }

    #[tokio::test]
    async fn test_prompt_carries_retrieved_context() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(RecordingModel::new("McCall."));
        let store = Arc::new(InMemoryStore::new());
        let service = test_service(&dir, true, model.clone(), store.clone());

        service.answer("Who was awarded damages?").await.unwrap();

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].starts_with("Use the following pieces of context"));
        assert!(prompts[0].contains("award of damages to McCall"));
        assert!(prompts[0].contains("Question: Who was awarded damages?"));
        assert!(prompts[0].ends_with("Helpful Answer:"));
    }

    #[tokio::test]
    async fn test_answer_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let model = Arc::new(RecordingModel::new("  The court affirmed.\n"));
        let store = Arc::new(InMemoryStore::new());
        let service = test_service(&dir, true, model.clone(), store.clone());

        let answer = service.answer("What happened?").await.unwrap();
        assert_eq!(answer, "The court affirmed.");
    }

    #[test]
    fn test_identity_probe_matching() {
        assert!(is_identity_probe("What is your name?"));
        assert!(is_identity_probe("WHAT IS YOUR NAME"));
        assert!(is_identity_probe("tell me your names"));
        assert!(!is_identity_probe("name your price"));
        assert!(!is_identity_probe("Who is the plaintiff?"));
    }

    #[test]
    fn test_build_prompt_joins_chunks() {
        let chunks = vec![
            ScoredChunk {
                page: 1,
                chunk_index: 0,
                content: "first piece".to_string(),
                score: 0.9,
            },
            ScoredChunk {
                page: 2,
                chunk_index: 1,
                content: "second piece".to_string(),
                score: 0.8,
            },
        ];
        let prompt = build_prompt(&chunks, "what happened?");
        assert!(prompt.contains("first piece\n\nsecond piece"));
        assert!(prompt.contains("Question: what happened?"));
    }

    #[test]
    fn test_build_prompt_with_no_context() {
        let prompt = build_prompt(&[], "anything?");
        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.contains("Question: anything?"));
    }
}
