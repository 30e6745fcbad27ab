//! The grounding state machine:
//! `CLASSIFY -> (SKIP_SEARCH | RETRIEVE) -> VALIDATE -> (REFUSE |
//! BUILD_PROMPT) -> GENERATE -> POST_SCREEN -> RESPOND`.
//!
//! Generation never starts before the refusal gate has resolved, and
//! every failure mode inside the pipeline maps to a user-visible string;
//! nothing propagates as an error to the caller.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, warn};

use super::instant::instant_reply;
use super::learning::{KnowledgeWriter, spawn_indexing};
use super::models::*;
use super::screen::find_hedging_marker;
use crate::core::config::GroundwireConfig;
use crate::core::error::{GroundwireError, Result};
use crate::core::session::{ResponseCache, SessionStore};
use crate::evidence::corpus::CorpusSource;
use crate::evidence::encyclopedia::WikipediaSource;
use crate::evidence::source::EvidenceSource;
use crate::evidence::web::GoogleSearchSource;
use crate::generate::ollama::OllamaGenerator;
use crate::generate::prompt::{
    ASSISTANT_PERSONA, ResponseStyle, build_grounded_block, select_system_prompt,
};
use crate::generate::provider::{
    ChatMessage, GenerationError, GenerationOptions, GenerationProvider, TokenStream,
};
use crate::index::embedder::Embedder;
use crate::index::store::VectorIndex;
use crate::intent::classifier::{IntentClassifier, classify_requirement};
use crate::intent::models::IntentResult;
use crate::validate::{EvidenceValidator, ValidationVerdict};

/// A retrieval backend plus the number of results it may contribute.
pub type PrioritizedSource = (Arc<dyn EvidenceSource>, usize);

enum Prepared {
    /// Instant replies, cache hits, rejections and refusals: the final
    /// answer exists before generation.
    Immediate(String),
    Generate {
        question: String,
        messages: Vec<ChatMessage>,
        options: GenerationOptions,
        needs_search: bool,
        has_evidence: bool,
        cache_key: String,
    },
}

pub struct GroundingOrchestrator {
    config: GroundwireConfig,
    classifier: IntentClassifier,
    validator: EvidenceValidator,
    embedder: Arc<Embedder>,
    /// Tried in priority order; the first source with results wins.
    web_chain: Vec<PrioritizedSource>,
    /// Always queried during retrieval, independent of the web chain.
    corpus_sources: Vec<PrioritizedSource>,
    generator: Arc<dyn GenerationProvider>,
    knowledge: Option<Arc<dyn KnowledgeWriter>>,
    documents: Option<Arc<VectorIndex>>,
    sessions: SessionStore,
    cache: ResponseCache,
}

impl GroundingOrchestrator {
    /// Wire the full pipeline from config: both persisted corpora, the
    /// web and encyclopedia adapters, and the Ollama generation backend.
    pub fn new(config: GroundwireConfig) -> Result<Self> {
        let embedder = Arc::new(Embedder::from_config(&config));
        let data = Path::new(&config.data_dir);

        let documents = Arc::new(VectorIndex::open(
            "documents",
            embedder.clone(),
            data.join("texts.json"),
            data.join("vectors.json"),
        )?);
        let knowledge = Arc::new(VectorIndex::open(
            "knowledge",
            embedder.clone(),
            data.join("knowledge_texts.json"),
            data.join("knowledge_vectors.json"),
        )?);

        let web_chain: Vec<PrioritizedSource> = vec![
            (
                Arc::new(GoogleSearchSource::from_config(&config)),
                config.web_max_results,
            ),
            (
                Arc::new(WikipediaSource::from_config(&config)),
                config.wiki_max_chunks,
            ),
        ];
        let corpus_sources: Vec<PrioritizedSource> = vec![
            (
                Arc::new(CorpusSource::documents(documents.clone())),
                config.document_top_k,
            ),
            (
                Arc::new(CorpusSource::knowledge(knowledge.clone())),
                config.knowledge_top_k,
            ),
        ];

        let generator = Arc::new(OllamaGenerator::from_config(&config));
        let sessions = SessionStore::new(config.history_cap);
        let cache = ResponseCache::new(config.response_cache_size, config.response_cache_ttl_secs);

        info!(
            model = %config.llm_model,
            web_search = config.web_search_configured(),
            documents = documents.len(),
            knowledge = knowledge.len(),
            "grounding orchestrator initialized"
        );

        Ok(Self {
            classifier: IntentClassifier::new(),
            validator: EvidenceValidator::new(),
            embedder,
            web_chain,
            corpus_sources,
            generator,
            knowledge: Some(knowledge.clone()),
            documents: Some(documents),
            sessions,
            cache,
            config,
        })
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_validator(mut self, validator: EvidenceValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_web_chain(mut self, chain: Vec<PrioritizedSource>) -> Self {
        self.web_chain = chain;
        self
    }

    pub fn with_corpus_sources(mut self, sources: Vec<PrioritizedSource>) -> Self {
        self.corpus_sources = sources;
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn GenerationProvider>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_knowledge_writer(mut self, writer: Option<Arc<dyn KnowledgeWriter>>) -> Self {
        self.knowledge = writer;
        self
    }

    /// Warm the embedding backend before the first real request.
    pub async fn warm_up(&self) {
        self.embedder.warm_up().await;
    }

    /// Append plain texts to the document corpus.
    pub async fn ingest_documents(&self, texts: &[String]) -> Result<usize> {
        match &self.documents {
            Some(index) => index.add(texts).await,
            None => Err(GroundwireError::Internal(
                "no document corpus attached".to_string(),
            )),
        }
    }

    /// Single entry point: always returns a user-facing string. Refusals
    /// are successful responses, not errors.
    pub async fn answer(&self, query: &str, user_id: &str, options: &AnswerOptions) -> String {
        match self.prepare(query, user_id, options).await {
            Prepared::Immediate(text) => text,
            Prepared::Generate {
                question,
                messages,
                options: gen_options,
                needs_search,
                has_evidence,
                cache_key,
            } => {
                let stream = match self.generator.chat_stream(&messages, &gen_options).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!("could not open generation stream: {}", e);
                        return open_failure_message(&e);
                    }
                };
                let raw = drain_stream(stream).await;
                self.post_process(user_id, &question, raw, needs_search, has_evidence, &cache_key)
            }
        }
    }

    /// Streaming variant: yields tokens, then a terminal `Done` with the
    /// post-screened final answer. Dropping the stream mid-generation
    /// cancels the backend request; a cancelled stream persists nothing.
    pub async fn answer_stream(
        self: Arc<Self>,
        query: String,
        user_id: String,
        options: AnswerOptions,
    ) -> impl futures::Stream<Item = StreamEvent> + Send {
        let (tx, rx) = futures::channel::mpsc::unbounded();

        match self.prepare(&query, &user_id, &options).await {
            Prepared::Immediate(text) => {
                let _ = tx.unbounded_send(StreamEvent::Token(text.clone()));
                let _ = tx.unbounded_send(StreamEvent::Done(text));
            }
            Prepared::Generate {
                question,
                messages,
                options: gen_options,
                needs_search,
                has_evidence,
                cache_key,
            } => {
                let this = self.clone();
                tokio::spawn(async move {
                    let mut stream = match this.generator.chat_stream(&messages, &gen_options).await
                    {
                        Ok(stream) => stream,
                        Err(e) => {
                            warn!("could not open generation stream: {}", e);
                            let msg = open_failure_message(&e);
                            let _ = tx.unbounded_send(StreamEvent::Token(msg.clone()));
                            let _ = tx.unbounded_send(StreamEvent::Done(msg));
                            return;
                        }
                    };

                    let mut full = String::new();
                    while let Some(item) = stream.next().await {
                        let token = match item {
                            Ok(token) => token,
                            Err(e) => {
                                warn!("generation stream error: {}", e);
                                let suffix = stream_failure_suffix(&e);
                                full.push_str(&suffix);
                                let _ = tx.unbounded_send(StreamEvent::Token(suffix));
                                break;
                            }
                        };
                        full.push_str(&token);
                        if tx.unbounded_send(StreamEvent::Token(token)).is_err() {
                            info!("client disconnected, cancelling generation");
                            return;
                        }
                    }

                    let final_answer = this.post_process(
                        &user_id,
                        &question,
                        full,
                        needs_search,
                        has_evidence,
                        &cache_key,
                    );
                    let _ = tx.unbounded_send(StreamEvent::Done(final_answer));
                });
            }
        }

        rx
    }

    async fn prepare(&self, query: &str, user_id: &str, options: &AnswerOptions) -> Prepared {
        let question = query.trim();
        if question.is_empty() {
            return Prepared::Immediate(MSG_EMPTY_QUERY.to_string());
        }
        if question.chars().count() > self.config.max_question_len {
            return Prepared::Immediate(format!(
                "Question too long (max {} characters).",
                self.config.max_question_len
            ));
        }

        if let Some(reply) = instant_reply(question) {
            info!("instant reply, no retrieval or generation");
            self.sessions.append(user_id, "user", question);
            self.sessions.append(user_id, "assistant", &reply);
            return Prepared::Immediate(reply);
        }

        let style = options
            .style
            .or_else(|| ResponseStyle::detect(question))
            .unwrap_or(ResponseStyle::Balanced);

        let cache_key = ResponseCache::make_key(question, user_id, &style.to_string());
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!("response cache hit");
            return Prepared::Immediate(cached);
        }

        let intent = self.classify(question, options.force_search);
        let decision = self.ground(question, &intent, options).await;

        if let Some(refusal) = decision.refusal_message() {
            info!(action = %decision.action, "refusing before generation");
            self.sessions.append(user_id, "user", question);
            self.sessions.append(user_id, "assistant", refusal);
            return Prepared::Immediate(refusal.to_string());
        }

        if !self.generator.is_available().await {
            error!("generation backend unreachable");
            return Prepared::Immediate(MSG_BACKEND_DOWN.to_string());
        }

        let messages = self.build_messages(question, user_id, &decision, style);
        self.sessions.append(user_id, "user", question);

        let mut gen_options = GenerationOptions {
            temperature: self.config.llm_temperature,
            ..Default::default()
        };
        style.adjust(&mut gen_options);

        Prepared::Generate {
            question: question.to_string(),
            messages,
            options: gen_options,
            needs_search: intent.needs_search,
            has_evidence: !decision.evidence.is_empty(),
            cache_key,
        }
    }

    fn classify(&self, question: &str, force_search: bool) -> IntentResult {
        let mut intent = self.classifier.classify(question);
        if force_search && !intent.needs_search {
            intent.needs_search = true;
            intent.requirement = classify_requirement(question);
            intent.search_terms = Some(self.classifier.extract_search_terms(question));
            intent.reason = "search forced by caller";
        }
        info!(
            intent = %intent.intent,
            needs_search = intent.needs_search,
            requirement = %intent.requirement,
            reason = intent.reason,
            "query classified"
        );
        intent
    }

    /// RETRIEVE and VALIDATE. The web chain runs with early exit; the
    /// vector corpora always run and may do so concurrently with it.
    async fn ground(
        &self,
        question: &str,
        intent: &IntentResult,
        options: &AnswerOptions,
    ) -> GroundingDecision {
        if !intent.needs_search {
            return GroundingDecision::ungrounded();
        }

        let terms = intent
            .search_terms
            .clone()
            .unwrap_or_else(|| question.to_string());

        let chain_future = async {
            if !options.web_search_enabled {
                return Vec::new();
            }
            for (source, budget) in &self.web_chain {
                let results = source.search(&terms, *budget).await;
                if !results.is_empty() {
                    debug!(
                        provenance = %source.provenance(),
                        count = results.len(),
                        "chain source produced evidence"
                    );
                    return results;
                }
            }
            Vec::new()
        };

        let corpus_future = async {
            let mut all = Vec::new();
            for (source, budget) in &self.corpus_sources {
                all.extend(source.search(question, *budget).await);
            }
            all
        };

        let (chain_results, corpus_results) = tokio::join!(chain_future, corpus_future);

        // Web/encyclopedia evidence is validated for topical relevance
        // as soon as it exists; an off-topic page must not reach the
        // prompt even if the corpora contribute more text.
        if !chain_results.is_empty() {
            let texts: Vec<String> = chain_results.iter().map(|e| e.text.clone()).collect();
            if !self.validator.relevant(&texts, question) {
                warn!("retrieved evidence is not relevant to the query");
                return GroundingDecision {
                    evidence: chain_results,
                    verdict: Some(ValidationVerdict {
                        sufficient: false,
                        relevant: false,
                        reason: "evidence does not overlap the query terms",
                    }),
                    action: FinalAction::RefuseIrrelevantContext,
                };
            }
        }

        let mut evidence = chain_results;
        evidence.extend(corpus_results);

        if evidence.is_empty() {
            warn!("mandatory search produced no evidence");
            return GroundingDecision {
                evidence,
                verdict: None,
                action: FinalAction::RefuseNoSearchResults,
            };
        }

        let texts: Vec<String> = evidence.iter().map(|e| e.text.clone()).collect();
        if !self.validator.satisfies(intent.requirement, &texts) {
            warn!(requirement = %intent.requirement, "evidence fails the sufficiency check");
            return GroundingDecision {
                evidence,
                verdict: Some(ValidationVerdict {
                    sufficient: false,
                    relevant: true,
                    reason: "evidence lacks the required factual signal",
                }),
                action: FinalAction::RefuseInsufficientContext,
            };
        }

        debug!(items = evidence.len(), "evidence accepted for grounding");
        GroundingDecision {
            evidence,
            verdict: Some(ValidationVerdict {
                sufficient: true,
                relevant: true,
                reason: "evidence accepted",
            }),
            action: FinalAction::ProceedGrounded,
        }
    }

    fn build_messages(
        &self,
        question: &str,
        user_id: &str,
        decision: &GroundingDecision,
        style: ResponseStyle,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(ASSISTANT_PERSONA)];
        messages.push(ChatMessage::system(format!(
            "{}\n\n{}",
            select_system_prompt(question),
            style.instructions()
        )));

        messages.extend(self.sessions.window(user_id, self.config.history_window));

        if !decision.evidence.is_empty() {
            let texts: Vec<String> = decision.evidence.iter().map(|e| e.text.clone()).collect();
            let today = chrono::Local::now().date_naive();
            messages.push(ChatMessage::system(build_grounded_block(&texts, today)));
            info!(items = texts.len(), "grounded context injected");
        }

        messages.push(ChatMessage::user(question));
        messages
    }

    /// POST_SCREEN and RESPOND: discard hedged answers on grounded
    /// paths, persist history, feed the learning loop, fill the cache.
    fn post_process(
        &self,
        user_id: &str,
        question: &str,
        answer: String,
        needs_search: bool,
        has_evidence: bool,
        cache_key: &str,
    ) -> String {
        let trimmed = answer.trim();
        if trimmed.chars().count() < 5 {
            warn!("generation produced an empty or degenerate answer");
            return MSG_GENERATION_FAILED.to_string();
        }
        let mut answer = trimmed.to_string();

        if needs_search && has_evidence {
            if let Some(marker) = find_hedging_marker(&answer) {
                error!(marker, "hedging detected in grounded answer, substituting refusal");
                answer = APOLOGY_HALLUCINATION.to_string();
            }
        }

        self.sessions.append(user_id, "assistant", &answer);

        if answer != APOLOGY_HALLUCINATION {
            if let Some(writer) = &self.knowledge {
                spawn_indexing(writer.clone(), question.to_string(), answer.clone());
            }
            self.cache.set(cache_key, answer.clone());
        }

        answer
    }
}

async fn drain_stream(mut stream: TokenStream) -> String {
    let mut full = String::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(token) => full.push_str(&token),
            Err(e) => {
                warn!("generation stream error: {}", e);
                full.push_str(&stream_failure_suffix(&e));
                break;
            }
        }
    }
    full
}

/// Message when the stream could not be opened at all.
fn open_failure_message(e: &GenerationError) -> String {
    match e {
        GenerationError::Unreachable(_) => MSG_BACKEND_DOWN.to_string(),
        GenerationError::Timeout(secs) => format!(
            "Warning: response timed out after {secs}s - please try a shorter question"
        ),
        GenerationError::Stalled(secs) => {
            format!("Warning: generation stalled - no output for {secs}s")
        }
        _ => MSG_GENERATION_FAILED.to_string(),
    }
}

/// Suffix appended to a partial answer when the stream died mid-flight.
fn stream_failure_suffix(e: &GenerationError) -> String {
    match e {
        GenerationError::Timeout(secs) => format!(
            "\n\nWarning: response timed out after {secs}s - please try a shorter question"
        ),
        GenerationError::Stalled(secs) => {
            format!("\n\nWarning: generation stalled - no output for {secs}s")
        }
        GenerationError::Unreachable(_) => {
            "\n\nWarning: connection error - is the generation backend running?".to_string()
        }
        _ => "\n\nWarning: generation error - please try again".to_string(),
    }
}
