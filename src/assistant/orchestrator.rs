//! Streaming turn controller
//!
//! `Assistant::stream_answer` yields the turn as a pull-driven sequence of
//! `StreamEvent`s: raw chunks while generation runs, then one `Final`
//! event carrying the citation-resolved answer. The accumulator is local
//! to each call; abandoning the stream mid-turn discards the partial
//! answer without touching session history.

use crate::citations::CitationResolver;
use crate::config::AssistantConfig;
use crate::errors::{AssistantError, Result};
use crate::instruction::InstructionSet;
use crate::providers::{
    ChunkStream, ContentSearchClient, GenerationProvider, OllamaProvider, SearchProvider,
};
use crate::rag::{ContextRetriever, RetrievalGate};
use crate::session::ConversationSession;
use crate::types::{ConversationTurn, StreamEvent};
use futures_util::{stream, Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Context substituted when grounding is skipped or comes back empty
pub const FALLBACK_CONTEXT: &str =
    "No documents retrieved for this question. Respond using only your general knowledge.";

/// The one message users see when a turn cannot start
const USER_ERROR_MESSAGE: &str = "Lo sentimos, ocurrió un error mientras procesábamos tu \
     consulta. Por favor, intenta repetir tu pregunta. Si el problema persiste, contacta al \
     equipo de soporte.";

/// One conversational assistant: gate, retriever, resolver, and session
pub struct Assistant {
    gate: RetrievalGate,
    retriever: ContextRetriever,
    resolver: CitationResolver,
    session: ConversationSession,
    generation: Arc<dyn GenerationProvider>,
    instruction: String,
}

impl Assistant {
    /// Assemble an assistant from explicitly constructed components
    pub fn new(
        gate: RetrievalGate,
        retriever: ContextRetriever,
        resolver: CitationResolver,
        generation: Arc<dyn GenerationProvider>,
        instruction: String,
    ) -> Self {
        Self {
            gate,
            retriever,
            resolver,
            session: ConversationSession::new(),
            generation,
            instruction,
        }
    }

    /// Wire the concrete providers from configuration
    pub fn from_config(config: &AssistantConfig) -> anyhow::Result<Self> {
        use crate::citations::CorpusIndex;

        let api_key = config.search.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!("no search API key in environment or config file")
        })?;

        let generation: Arc<dyn GenerationProvider> = Arc::new(OllamaProvider::with_config(
            &config.ollama.base_url,
            &config.ollama.chat_model,
            &config.ollama.utility_model,
        )?);

        let search: Arc<dyn SearchProvider> =
            Arc::new(ContentSearchClient::new(&config.search.base_url, &api_key)?);

        let keywords = RetrievalGate::load_keywords(&config.assistant.keywords_path);
        let gate = RetrievalGate::new(generation.clone(), keywords, &config.assistant.topic);

        let retriever = ContextRetriever::with_buckets(
            search,
            generation.clone(),
            config.search.bucket_primary,
            config.bucket_translated(),
            config.search.top_n,
        );

        let corpus = CorpusIndex::load(&config.corpus.docs_dir)?;
        let resolver = CitationResolver::with_threshold(corpus, config.corpus.threshold)
            .with_docs_base(&config.corpus.base_path);

        let instruction = InstructionSet::load(&config.assistant.instruction_path)?.render();

        Ok(Self::new(gate, retriever, resolver, generation, instruction))
    }

    /// Stream one answered turn
    ///
    /// Finite and not restartable. Yields every non-empty generation chunk
    /// as it arrives, then exactly one `Final` event with the resolved
    /// answer. If setup fails before generation starts, yields a single
    /// chunk with the user-facing error message and nothing is recorded.
    pub fn stream_answer(&mut self, query: &str) -> impl Stream<Item = StreamEvent> + '_ {
        let state = TurnState {
            assistant: self,
            phase: TurnPhase::Start {
                query: query.to_string(),
            },
        };

        stream::unfold(state, |mut state| async move {
            loop {
                match std::mem::replace(&mut state.phase, TurnPhase::Done) {
                    TurnPhase::Start { query } => {
                        match state.assistant.prepare_turn(&query).await {
                            Ok(inner) => {
                                state.phase = TurnPhase::Streaming {
                                    query,
                                    inner,
                                    accumulated: String::new(),
                                };
                            }
                            Err(e) => {
                                error!(error = %e, "turn setup failed");
                                return Some((
                                    StreamEvent::Chunk(USER_ERROR_MESSAGE.to_string()),
                                    state,
                                ));
                            }
                        }
                    }

                    TurnPhase::Streaming {
                        query,
                        mut inner,
                        mut accumulated,
                    } => match inner.next().await {
                        Some(Ok(chunk)) => {
                            if chunk.is_empty() {
                                state.phase = TurnPhase::Streaming {
                                    query,
                                    inner,
                                    accumulated,
                                };
                                continue;
                            }
                            accumulated.push_str(&chunk);
                            state.phase = TurnPhase::Streaming {
                                query,
                                inner,
                                accumulated,
                            };
                            return Some((StreamEvent::Chunk(chunk), state));
                        }
                        Some(Err(e)) => {
                            // Delivered chunks are never retracted; the
                            // partial answer is committed as-is.
                            warn!(error = %e, "stream error, committing partial answer");
                            let resolved = state.assistant.commit_turn(&query, accumulated);
                            state.phase = TurnPhase::Deliver { resolved };
                        }
                        None => {
                            let resolved = state.assistant.commit_turn(&query, accumulated);
                            state.phase = TurnPhase::Deliver { resolved };
                        }
                    },

                    TurnPhase::Deliver { resolved } => {
                        return Some((StreamEvent::Final(resolved), state));
                    }

                    TurnPhase::Done => return None,
                }
            }
        })
    }

    /// Gate, ground, build the prompt, and open the generation stream
    async fn prepare_turn(&mut self, query: &str) -> Result<ChunkStream> {
        let grounding_needed = match self.gate.should_retrieve(query).await {
            Ok(verdict) => verdict,
            Err(e) => {
                // Fail open: a broken classifier must not kill the turn.
                warn!(error = %e, "classification failed, proceeding without grounding");
                false
            }
        };

        let context = if grounding_needed {
            match self.fetch_grounding(query).await {
                Ok(context) => context,
                Err(e @ (AssistantError::Retrieval(_) | AssistantError::Translation(_))) => {
                    warn!(error = %e, "soft retrieval failure, using fallback context");
                    FALLBACK_CONTEXT.to_string()
                }
                Err(e) => return Err(e),
            }
        } else {
            info!("no grounding for this query");
            FALLBACK_CONTEXT.to_string()
        };

        let messages = self.session.build_prompt(&self.instruction, &context, query);
        debug!(message_count = messages.len(), "prompt built");

        self.generation.generate_stream(messages).await
    }

    async fn fetch_grounding(&self, query: &str) -> Result<String> {
        let translated = self.retriever.translate(query).await?;
        debug!(translated = %translated, "query translated");
        self.retriever.fetch_context(query, &translated).await
    }

    /// Trim, record, and resolve the completed answer
    fn commit_turn(&mut self, query: &str, accumulated: String) -> String {
        let final_answer = accumulated.trim().to_string();
        info!(answer_len = final_answer.len(), "turn complete, recording");
        self.session.record_turn(query, final_answer.clone());
        self.resolver.resolve_references(&final_answer)
    }

    /// Undo the most recent turn; no-op on empty history
    pub fn erase_last(&mut self) -> Option<ConversationTurn> {
        self.session.erase_last()
    }

    /// Re-enumerate the citation corpus directory
    pub fn reload_corpus(&mut self) -> Result<usize> {
        self.resolver.reload_corpus()
    }

    /// Current session state
    pub fn session(&self) -> &ConversationSession {
        &self.session
    }
}

/// Per-call turn state threaded through the stream
struct TurnState<'a> {
    assistant: &'a mut Assistant,
    phase: TurnPhase,
}

enum TurnPhase {
    Start {
        query: String,
    },
    Streaming {
        query: String,
        inner: ChunkStream,
        accumulated: String,
    },
    Deliver {
        resolved: String,
    },
    Done,
}
