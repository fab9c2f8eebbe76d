use crate::activity::{ActivityLog, LogSource};
use crate::cache::{CacheStatus, Caches};
use crate::config::{Config, PromptConfig};
use crate::dates;
use crate::error::{Result, WayfarerError};
use crate::fetch::GraphqlFetcher;
use crate::kinds::ContentKind;
use crate::model::{GeminiModel, GenerativeModel};
use crate::prompt;
use crate::reduce::{self, RawRecord};
use crate::tokens::{ReductionStats, TokenCounter};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Characters of the model response copied into the activity log.
const RESPONSE_PREVIEW_CHARS: usize = 100;

const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// True when `text` is the "no data" answer for `kind`, meaning the cache had
/// nothing to ground the model on.
pub fn is_no_data_sentinel(kind: ContentKind, text: &str) -> bool {
    text == kind.no_data_sentinel()
}

/// Answers one question about events or pages from cached CMS data.
///
/// Shared by `Arc` across sessions; the only per-call state is the prompt.
pub struct QueryEngine {
    caches: Caches,
    model: Arc<dyn GenerativeModel>,
    tokens: TokenCounter,
    log: Arc<ActivityLog>,
    prompt: PromptConfig,
    model_timeout: Duration,
}

impl QueryEngine {
    pub fn new(caches: Caches, model: Arc<dyn GenerativeModel>, log: Arc<ActivityLog>) -> Self {
        Self {
            caches,
            model,
            tokens: TokenCounter::new(),
            log,
            prompt: PromptConfig::default(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    /// Wire the GraphQL fetcher, Gemini model and activity log file from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let api_key = config
            .model_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| WayfarerError::Config("GOOGLE_API_KEY is not set".into()))?;

        let log = Arc::new(ActivityLog::open(&config.log_file)?);

        let mut fetcher = GraphqlFetcher::new(config.cms_url.clone())
            .with_language(config.cms_language.clone());
        if let Some(token) = &config.cms_token {
            fetcher = fetcher.with_token(token.clone());
        }

        let caches = Caches::new(Arc::new(fetcher), &config.cache_config(), log.clone());
        let model = Arc::new(GeminiModel::new(api_key, config.model_config()));
        log.system(format!(
            "System initialized with model {} against {}",
            config.model, config.cms_url
        ));

        Ok(Self::new(caches, model, log)
            .with_prompt_config(config.prompt_config())
            .with_model_timeout(config.model_timeout()))
    }

    pub fn with_prompt_config(mut self, prompt: PromptConfig) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_token_counter(mut self, tokens: TokenCounter) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn caches(&self) -> &Caches {
        &self.caches
    }

    pub fn log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    pub fn cache_status(&self) -> Vec<CacheStatus> {
        self.caches.status()
    }

    pub async fn refresh_all(&self) {
        self.caches.refresh_all().await
    }

    /// Answer `query` from the `kind` cache.
    ///
    /// Never fails: an empty cache yields the kind's no-data sentinel without
    /// a model call, and model errors or timeouts yield the kind's error string.
    pub async fn answer(&self, kind: ContentKind, query: &str) -> String {
        self.log
            .log(LogSource::User, format!("{} query: {}", kind.label(), query));

        let records = self.caches.store(kind).get().await;
        if records.is_empty() {
            self.log.error(format!("No {} data available", kind));
            return kind.no_data_sentinel().to_string();
        }

        match self.grounded_answer(kind, query, &records).await {
            Ok(text) => text,
            Err(e) => {
                self.log.error(format!("Error in {} query: {}", kind, e));
                format!("{}: {}", kind.error_prefix(), e)
            }
        }
    }

    async fn grounded_answer(
        &self,
        kind: ContentKind,
        query: &str,
        records: &[RawRecord],
    ) -> Result<String> {
        let outcomes = reduce::reduce_all(records, kind);
        let failures = reduce::failure_count(&outcomes);
        if failures > 0 {
            self.log.system(format!(
                "{} of {} {} records could not be reduced",
                failures,
                outcomes.len(),
                kind
            ));
        }
        let context = reduce::to_context_json(&outcomes)?;

        if self.tokens.is_enabled() {
            let original = serde_json::to_string(records)?;
            let stats = ReductionStats {
                original: self.tokens.count(&original),
                reduced: self.tokens.count(&context),
            };
            self.log.log(LogSource::Tokens, stats.describe(kind));
        }

        let today = Local::now().date_naive();
        let question = match kind {
            ContentKind::Events => dates::with_weekend_hint(query, today),
            ContentKind::Pages => query.to_string(),
        };
        let prompt = prompt::build(kind, &question, &context, today, &self.prompt);
        self.log.log(
            LogSource::Tokens,
            format!("{} prompt tokens: {}", kind.label(), self.tokens.count(&prompt)),
        );

        let started = Instant::now();
        let completion = tokio::time::timeout(self.model_timeout, self.model.generate(&prompt))
            .await
            .map_err(|_| WayfarerError::Timeout(self.model_timeout))??;

        self.log.system(format!(
            "{} response time: {:.2} seconds",
            kind.label(),
            started.elapsed().as_secs_f64()
        ));
        self.log.log(
            LogSource::Tokens,
            format!(
                "{} response tokens: {}",
                kind.label(),
                self.tokens.count(&completion.text)
            ),
        );
        self.log.log(LogSource::Model, preview(&completion.text));

        Ok(completion.text)
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngine")
            .field("caches", &self.caches)
            .field("model", &self.model.model_name())
            .field("model_timeout", &self.model_timeout)
            .finish()
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(RESPONSE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::fetch::ContentSource;
    use crate::model::Completion;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct FixedSource {
        events: Vec<Value>,
        pages: Vec<Value>,
    }

    #[async_trait]
    impl ContentSource for FixedSource {
        async fn fetch(&self, kind: ContentKind) -> Result<Vec<RawRecord>> {
            Ok(match kind {
                ContentKind::Events => self.events.clone(),
                ContentKind::Pages => self.pages.clone(),
            })
        }
    }

    /// Records every prompt and answers with `reply`, or fails when `reply` is `None`.
    struct ScriptedModel {
        reply: Option<String>,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn stalled(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Some("too late".to_string()),
                delay,
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<Completion> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match &self.reply {
                Some(text) => Ok(Completion { text: text.clone() }),
                None => Err(WayfarerError::Model("HTTP 429: quota exhausted".into())),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn engine(events: Vec<Value>, pages: Vec<Value>, model: Arc<ScriptedModel>) -> QueryEngine {
        let log = Arc::new(ActivityLog::tracing_only());
        let caches = Caches::new(
            Arc::new(FixedSource { events, pages }),
            &CacheConfig::default(),
            log.clone(),
        );
        QueryEngine::new(caches, model, log).with_token_counter(TokenCounter::disabled())
    }

    fn concert() -> Value {
        json!({
            "title": "Sommarkonsert",
            "content": "<p>Musik i parken.</p>",
            "uri": "/evenemang/sommarkonsert/",
            "location": { "name": "Stadsparken" },
            "acfGroupEvent": {
                "occasions": [{ "startDate": "2025-07-12", "endDate": "2025-07-12" }]
            }
        })
    }

    #[tokio::test]
    async fn test_empty_cache_returns_sentinel_without_model_call() {
        let model = ScriptedModel::replying("unused");
        let engine = engine(vec![], vec![], model.clone());

        let answer = engine.answer(ContentKind::Events, "Vad händer idag?").await;

        assert_eq!(answer, ContentKind::Events.no_data_sentinel());
        assert!(is_no_data_sentinel(ContentKind::Events, &answer));
        assert!(model.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_answer_sends_reduced_context() {
        let model = ScriptedModel::replying("**Evenemang:** Sommarkonsert");
        let engine = engine(vec![concert()], vec![], model.clone());

        let answer = engine.answer(ContentKind::Events, "Konserter?").await;

        assert_eq!(answer, "**Evenemang:** Sommarkonsert");
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Fråga: Konserter?"));
        assert!(prompts[0].contains("Eventdata: [{"));
        assert!(prompts[0].contains("Stadsparken"));
        assert!(!prompts[0].contains("<p>"));
        assert!(!prompts[0].contains("acfGroupEvent"));
    }

    #[tokio::test]
    async fn test_weekend_question_gets_dates() {
        let model = ScriptedModel::replying("ok");
        let engine = engine(vec![concert()], vec![], model.clone());

        engine.answer(ContentKind::Events, "Vad händer i helgen?").await;

        assert!(model.prompts()[0].contains("(referring to dates "));
    }

    #[tokio::test]
    async fn test_pages_use_page_context() {
        let page = json!({ "title": "Badplatser", "content": "<p>Skrea strand.</p>", "uri": "/bada/", "date": "2024-05-01" });
        let model = ScriptedModel::replying("Skrea strand");
        let engine = engine(vec![], vec![page], model.clone());

        let answer = engine.answer(ContentKind::Pages, "Var kan jag bada?").await;

        assert_eq!(answer, "Skrea strand");
        assert!(model.prompts()[0].contains("Webbsidesdata: [{"));
    }

    #[tokio::test]
    async fn test_model_error_becomes_error_string() {
        let engine = engine(vec![concert()], vec![], ScriptedModel::failing());

        let answer = engine.answer(ContentKind::Events, "Konserter?").await;

        assert!(answer.starts_with("Ett fel uppstod vid sökning efter evenemang: "));
        assert!(answer.contains("quota exhausted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_timeout_becomes_error_string() {
        let page = json!({ "title": "Hem", "content": "", "uri": "/" });
        let engine = engine(vec![], vec![page], ScriptedModel::stalled(Duration::from_secs(120)))
            .with_model_timeout(Duration::from_secs(5));

        let answer = engine.answer(ContentKind::Pages, "Öppettider?").await;

        assert!(answer.starts_with("Ett fel uppstod vid sökning på webbplatsen: "));
        assert!(answer.contains("timed out"));
    }

    #[test]
    fn test_preview_truncates_long_responses() {
        let long = "å".repeat(150);
        let short = preview(&long);
        assert_eq!(short.chars().count(), 103);
        assert!(short.ends_with("..."));
        assert_eq!(preview("kort"), "kort");
    }

    #[test]
    fn test_sentinel_is_kind_specific() {
        let events = ContentKind::Events.no_data_sentinel();
        assert!(is_no_data_sentinel(ContentKind::Events, events));
        assert!(!is_no_data_sentinel(ContentKind::Pages, events));
    }
}
