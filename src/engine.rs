//! The quiz engine event loop
//!
//! Every state change goes through one queue drained by a single task:
//! - `Tick` advances the countdown once per second
//! - `QuestionDue` is posted by the countdown callback and asks the next question
//! - `AnswerWindowExpired` is posted by the per-question timer
//! - `Chat` and `Host` carry inbound chat lines and host requests
//!
//! Chat sends and score-store calls never block the loop. Sends go to the
//! transport's outbound queue; store calls run on spawned tasks and only log on
//! failure, so scoring is at-most-once.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::AbortHandle;

use crate::chat::{ChatMessage, ChatSink, UserId};
use crate::commands::{Command, CommandTable};
use crate::config::BotConfig;
use crate::countdown::{spawn_ticker, Countdown};
use crate::error::{QuizError, QuizResult};
use crate::lang::{fill, Locale};
use crate::question::{Question, QuestionPool};
use crate::selector::CooldownSelector;
use crate::session::{normalize_submission, AnswerOutcome, AnswerWindow, Phase, Session};
use crate::store::{ScoreStore, ScoreTable};

#[derive(Debug)]
pub enum Event {
    Tick,
    QuestionDue,
    AnswerWindowExpired { generation: u64 },
    Chat(ChatMessage),
    Host(HostRequest),
    Shutdown,
}

#[derive(Debug)]
pub enum HostRequest {
    Start,
    Stop,
    SubmitAnswer { user: UserId, text: String },
    Status(oneshot::Sender<QuizStatus>),
    CurrentQuestion(oneshot::Sender<Option<Question>>),
}

/// Snapshot of the engine state for the host
#[derive(Debug, Clone, Serialize)]
pub struct QuizStatus {
    pub running: bool,
    pub phase: Phase,
    pub seconds_until_next_question: u32,
    pub current_question: Option<String>,
    pub pool_size: usize,
}

/// Cloneable handle for talking to a running engine
#[derive(Debug, Clone)]
pub struct QuizHandle {
    events: mpsc::UnboundedSender<Event>,
}

impl QuizHandle {
    #[cfg(test)]
    pub(crate) fn from_sender(events: mpsc::UnboundedSender<Event>) -> Self {
        Self { events }
    }

    fn post(&self, event: Event) -> bool {
        self.events.send(event).is_ok()
    }

    /// Feed an inbound chat line to the engine
    pub fn deliver(&self, message: ChatMessage) -> bool {
        self.post(Event::Chat(message))
    }

    /// Enable the ask/answer cycle. Returns true once the request is queued.
    pub fn start(&self) -> bool {
        self.post(Event::Host(HostRequest::Start))
    }

    /// Disable the ask/answer cycle. Returns true once the request is queued.
    pub fn stop(&self) -> bool {
        self.post(Event::Host(HostRequest::Stop))
    }

    pub fn submit_answer(&self, user: impl Into<UserId>, text: impl Into<String>) -> bool {
        self.post(Event::Host(HostRequest::SubmitAnswer {
            user: user.into(),
            text: text.into(),
        }))
    }

    /// `None` if the engine has shut down
    pub async fn status(&self) -> Option<QuizStatus> {
        let (tx, rx) = oneshot::channel();
        if !self.post(Event::Host(HostRequest::Status(tx))) {
            return None;
        }
        rx.await.ok()
    }

    pub async fn seconds_until_next_question(&self) -> Option<u32> {
        self.status().await.map(|s| s.seconds_until_next_question)
    }

    pub async fn current_question(&self) -> Option<Question> {
        let (tx, rx) = oneshot::channel();
        if !self.post(Event::Host(HostRequest::CurrentQuestion(tx))) {
            return None;
        }
        rx.await.ok().flatten()
    }

    pub fn shutdown(&self) {
        self.post(Event::Shutdown);
    }
}

/// Renders locale templates into the quiz channel. Cheap to clone into tasks.
#[derive(Clone)]
struct Announcer {
    chat: Arc<dyn ChatSink>,
    channel: String,
    locale: Arc<Locale>,
}

impl Announcer {
    fn say(&self, text: &str) {
        tracing::debug!("Saying in {}: {}", self.channel, text);
        self.chat.say(&self.channel, text);
    }

    fn say_template(&self, template: &str, params: &[(&str, &str)]) {
        self.say(&fill(template, params));
    }

    fn duration(&self, seconds: u64) -> String {
        self.locale.duration(seconds)
    }

    fn scores(&self, table: &ScoreTable) {
        if table.is_empty() {
            self.say(&self.locale.command_reset_nobody_has_points);
            return;
        }
        for (user, entry) in table {
            tracing::debug!("User \"{}\" has {} points", user, entry.score);
            self.say_template(
                &self.locale.command_score,
                &[("user", user), ("scoreNumber", &entry.score.to_string())],
            );
        }
    }
}

pub struct QuizEngine {
    config: BotConfig,
    commands: CommandTable,
    pool: QuestionPool,
    selector: CooldownSelector,
    countdown: Countdown,
    session: Session,
    announcer: Announcer,
    scores: Arc<dyn ScoreStore>,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl QuizEngine {
    pub fn new(
        config: BotConfig,
        pool: QuestionPool,
        selector: CooldownSelector,
        locale: Locale,
        chat: Arc<dyn ChatSink>,
        scores: Arc<dyn ScoreStore>,
    ) -> QuizResult<Self> {
        config.validate()?;
        if selector.pool_size() != pool.len() {
            return Err(QuizError::InvalidConfiguration(format!(
                "Selector covers {} questions but the pool has {}",
                selector.pool_size(),
                pool.len()
            )));
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let due_tx = events_tx.clone();
        let countdown = Countdown::new(
            config.interval_seconds(),
            Box::new(move || {
                // Queued, not run inside the tick
                let _ = due_tx.send(Event::QuestionDue);
            }),
        )?;

        let announcer = Announcer {
            chat,
            channel: config.channel_name.clone(),
            locale: Arc::new(locale),
        };

        Ok(Self {
            commands: CommandTable::from_config(&config),
            config,
            pool,
            selector,
            countdown,
            session: Session::new(),
            announcer,
            scores,
            events_tx,
            events_rx,
        })
    }

    pub fn handle(&self) -> QuizHandle {
        QuizHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Drive the engine until a shutdown request arrives
    pub async fn run(mut self) {
        let ticker = spawn_ticker(self.events_tx.clone(), Duration::from_secs(1), || Event::Tick);
        tracing::info!(
            "Quiz engine running with {} questions, asking every {}s",
            self.pool.len(),
            self.countdown.period_seconds()
        );

        while let Some(event) = self.next_event().await {
            if matches!(event, Event::Shutdown) {
                break;
            }
            self.handle_event(event);
        }

        ticker.abort();
        self.countdown.clear();
        self.session.resolve();
        tracing::info!("Quiz engine stopped");
    }

    pub(crate) async fn next_event(&mut self) -> Option<Event> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick => {
                self.countdown.tick();
            }
            Event::QuestionDue => self.ask_question(),
            Event::AnswerWindowExpired { generation } => self.time_out_question(generation),
            Event::Chat(message) => self.on_chat(message),
            Event::Host(request) => self.on_host_request(request),
            Event::Shutdown => {}
        }
    }

    fn seconds_until_next_question(&self) -> u64 {
        self.countdown.seconds_remaining() as u64
    }

    fn timeout_text(&self) -> String {
        let seconds = self.config.answer_timeout().map_or(0, |t| t.as_secs());
        self.announcer.duration(seconds)
    }

    fn ask_question(&mut self) {
        if !self.session.is_running() {
            tracing::info!("Bot is not running, skipping question");
            return;
        }

        let index = match self.selector.draw() {
            Ok(index) => index,
            Err(e) => {
                // Selection is undefined from here on, fail closed
                tracing::error!("Cannot draw a question, stopping the bot: {}", e);
                self.session.set_running(false);
                return;
            }
        };
        let Some(question) = self.pool.get(index).cloned() else {
            tracing::error!("Drew index {} outside the question pool", index);
            return;
        };

        let generation = self.session.next_generation();
        let window = self.config.answer_timeout().map(|timeout| {
            tracing::info!("Question will time out in {}s", timeout.as_secs());
            AnswerWindow::new(generation, Some(self.arm_answer_window(generation, timeout)))
        });
        if window.is_none() {
            tracing::debug!("No answer timeout configured");
        }

        let timeout_text = self.timeout_text();
        self.announcer.say_template(
            &self.announcer.locale.ask_question,
            &[
                ("question", &question.prompt),
                ("timeout", &timeout_text),
                ("answerPrefix", &self.config.answer_prefix),
            ],
        );
        tracing::info!(
            "Asked question {}: {} (answers: {:?})",
            question.index,
            question.prompt,
            question.accepted_answers
        );

        if let Some(previous) = self.session.ask(question, window) {
            tracing::info!("Question {} was superseded unanswered", previous.index);
        }
    }

    fn arm_answer_window(&self, generation: u64, timeout: Duration) -> AbortHandle {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let _ = tx.send(Event::AnswerWindowExpired { generation });
        })
        .abort_handle()
    }

    fn time_out_question(&mut self, generation: u64) {
        let Some(question) = self.session.expire(generation) else {
            return;
        };

        tracing::info!("Question {} timed out", question.index);
        let next = self.announcer.duration(self.seconds_until_next_question());
        self.announcer.say_template(
            &self.announcer.locale.question_timed_out,
            &[
                ("question", &question.prompt),
                ("answer", question.canonical_answer()),
                ("newQuestionIn", &next),
            ],
        );
    }

    fn on_chat(&mut self, message: ChatMessage) {
        let sender = message.sender.to_lowercase();

        if let Some(command) = self.commands.parse(&message.text) {
            tracing::debug!("Message from {} is command {:?}", sender, command);
            self.on_command(&sender, command);
            return;
        }

        self.submit_answer(&sender, &message.text);
    }

    fn on_host_request(&mut self, request: HostRequest) {
        match request {
            HostRequest::Start => self.start(),
            HostRequest::Stop => self.stop(),
            HostRequest::SubmitAnswer { user, text } => {
                self.submit_answer(&user.to_lowercase(), &text)
            }
            HostRequest::Status(reply) => {
                let _ = reply.send(self.status());
            }
            HostRequest::CurrentQuestion(reply) => {
                let _ = reply.send(self.session.active_question().cloned());
            }
        }
    }

    pub fn status(&self) -> QuizStatus {
        QuizStatus {
            running: self.session.is_running(),
            phase: self.session.phase(),
            seconds_until_next_question: self.countdown.seconds_remaining(),
            current_question: self.session.active_question().map(|q| q.prompt.clone()),
            pool_size: self.pool.len(),
        }
    }

    fn submit_answer(&mut self, user: &str, raw: &str) {
        let Some(answer) = normalize_submission(raw, &self.config.answer_prefix) else {
            return;
        };

        if !self.session.is_running() {
            tracing::debug!("Not reacting to answer from \"{}\", bot is stopped", user);
            return;
        }

        match self.session.submit(&answer) {
            AnswerOutcome::Correct(question) => {
                tracing::info!(
                    "User \"{}\" answered question {} correctly",
                    user,
                    question.index
                );
                let next = self.announcer.duration(self.seconds_until_next_question());
                self.announcer.say_template(
                    &self.announcer.locale.correct_answer,
                    &[("user", user), ("newQuestionIn", &next)],
                );
                self.record_point(user);
            }
            AnswerOutcome::Wrong => {
                if self.config.react_to_wrong_answer {
                    self.announcer
                        .say_template(&self.announcer.locale.wrong_answer, &[("user", user)]);
                }
            }
            AnswerOutcome::NoQuestion => self.no_question(user),
        }
    }

    fn no_question(&self, user: &str) {
        if self.config.react_to_no_question {
            self.announcer
                .say_template(&self.announcer.locale.no_question, &[("user", user)]);
        } else {
            tracing::debug!("No question active, not reacting to \"{}\"", user);
        }
    }

    fn record_point(&self, user: &str) {
        let scores = self.scores.clone();
        let user = user.to_string();
        tokio::spawn(async move {
            match scores.increment(&user).await {
                Ok(score) => tracing::debug!("User \"{}\" now has {} points", user, score),
                Err(e) => tracing::error!("Failed to record point for \"{}\": {}", user, e),
            }
        });
    }

    fn on_command(&mut self, user: &str, command: Command) {
        if command.is_admin() && !self.commands.is_admin(user) {
            tracing::warn!(
                "Invalid user tried to execute admin command. User: \"{}\"; Command: {:?}",
                user,
                command
            );
            return;
        }

        match command {
            Command::PersonalScore => {
                tracing::info!("User \"{}\" asked for their score", user);
                let scores = self.scores.clone();
                let announcer = self.announcer.clone();
                let user = user.to_string();
                tokio::spawn(async move {
                    match scores.read_one(&user).await {
                        Ok(score) => announcer.say_template(
                            &announcer.locale.command_score,
                            &[("user", &user), ("scoreNumber", &score.to_string())],
                        ),
                        Err(e) => tracing::error!("Failed to read score of \"{}\": {}", user, e),
                    }
                });
            }
            Command::CurrentQuestion => {
                tracing::info!("User \"{}\" asked for the current question", user);
                if !self.session.is_question_active() {
                    self.no_question(user);
                } else if let Some(question) = self.session.active_question() {
                    let timeout_text = self.timeout_text();
                    self.announcer.say_template(
                        &self.announcer.locale.ask_question,
                        &[
                            ("question", &question.prompt),
                            ("timeout", &timeout_text),
                            ("answerPrefix", &self.config.answer_prefix),
                        ],
                    );
                }
            }
            Command::AllScores => {
                tracing::info!("Admin \"{}\" asked for all scores", user);
                let scores = self.scores.clone();
                let announcer = self.announcer.clone();
                tokio::spawn(async move {
                    match scores.read_all().await {
                        Ok(table) => announcer.scores(&table),
                        Err(e) => tracing::error!("Failed to read scores: {}", e),
                    }
                });
            }
            Command::ResetScores => {
                tracing::info!("Admin \"{}\" reset all scores", user);
                let scores = self.scores.clone();
                let announcer = self.announcer.clone();
                tokio::spawn(async move {
                    match scores.reset_all().await {
                        Ok(previous) => {
                            announcer.say(&announcer.locale.command_reset);
                            announcer.scores(&previous);
                        }
                        Err(e) => tracing::error!("Failed to reset scores: {}", e),
                    }
                });
            }
            Command::Start => self.start(),
            Command::Stop => self.stop(),
        }
    }

    fn start(&mut self) {
        self.session.set_running(true);
        let interval = self.announcer.duration(self.countdown.period_seconds() as u64);
        let next = self.announcer.duration(self.seconds_until_next_question());
        self.announcer.say_template(
            &self.announcer.locale.bot_started,
            &[("interval", &interval), ("next", &next)],
        );
        tracing::info!("Started bot");
    }

    fn stop(&mut self) {
        self.session.set_running(false);
        self.announcer.say(&self.announcer.locale.bot_stopped);
        tracing::info!("Stopped bot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::store::MemoryScoreStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingChat {
        lines: Mutex<Vec<String>>,
    }

    impl RecordingChat {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.lines.lock().unwrap())
        }
    }

    impl ChatSink for RecordingChat {
        fn say(&self, _channel: &str, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }

    struct Fixture {
        engine: QuizEngine,
        chat: Arc<RecordingChat>,
        scores: Arc<MemoryScoreStore>,
    }

    fn pool() -> QuestionPool {
        QuestionPool::new(vec![
            Question::new(0, "Capital of France?", vec!["Paris".to_string()]),
            Question::new(1, "Largest US city?", vec!["New York".to_string(), "NYC".to_string()]),
            Question::new(2, "Red planet?", vec!["Mars".to_string()]),
            Question::new(3, "Symbol for gold?", vec!["Au".to_string()]),
        ])
        .unwrap()
    }

    fn fixture(config: BotConfig) -> Fixture {
        let pool = pool();
        let selector =
            CooldownSelector::seeded(pool.len(), config.question_cooldown_percent, 7).unwrap();
        let chat = Arc::new(RecordingChat::default());
        let scores = Arc::new(MemoryScoreStore::new());
        let engine = QuizEngine::new(
            config,
            pool,
            selector,
            Locale::default(),
            chat.clone(),
            scores.clone(),
        )
        .unwrap();
        Fixture {
            engine,
            chat,
            scores,
        }
    }

    fn chat(sender: &str, text: &str) -> Event {
        Event::Chat(ChatMessage {
            channel: "#quizchannel".to_string(),
            sender: sender.to_string(),
            text: text.to_string(),
        })
    }

    /// Let spawned store tasks finish
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    fn started(config: BotConfig) -> Fixture {
        let mut f = fixture(config);
        f.engine.handle_event(Event::Host(HostRequest::Start));
        f.chat.take();
        f
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_then_correct_answer_scores_once() {
        let mut f = started(test_config());

        f.engine.handle_event(Event::QuestionDue);
        assert_eq!(f.engine.session().phase(), Phase::Asked);
        let question = f.engine.session().active_question().unwrap().clone();
        assert!(f.chat.take()[0].contains(&question.prompt));

        let answer = format!("!a {}", question.canonical_answer());
        f.engine.handle_event(chat("Anna", &answer));
        assert_eq!(f.engine.session().phase(), Phase::Idle);

        // A second correct answer arrives too late
        f.engine.handle_event(chat("Ben", &answer));

        settle().await;
        let table = f.scores.read_all().await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["anna"].score, 1);

        let lines = f.chat.take();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("anna got it right"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_question_times_out() {
        let mut f = started(test_config());

        f.engine.handle_event(Event::QuestionDue);
        let question = f.engine.session().active_question().unwrap().clone();
        f.chat.take();

        // Nothing else is scheduled, so the next event is the answer window
        let event = f.engine.next_event().await.unwrap();
        assert!(matches!(event, Event::AnswerWindowExpired { .. }));
        f.engine.handle_event(event);

        assert_eq!(f.engine.session().phase(), Phase::Idle);
        let lines = f.chat.take();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(question.canonical_answer()));
        assert!(lines[0].contains("Next question in 59 seconds"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_correct_answer_cancels_answer_window() {
        let mut f = started(test_config());

        f.engine.handle_event(Event::QuestionDue);
        let question = f.engine.session().active_question().unwrap().clone();
        f.engine
            .handle_event(chat("anna", &format!("!a {}", question.canonical_answer())));
        f.chat.take();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(f.engine.events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_never_expires() {
        let mut config = test_config();
        config.question_timeout_in_seconds = 0;
        let mut f = started(config);

        f.engine.handle_event(Event::QuestionDue);
        tokio::time::sleep(Duration::from_secs(3600)).await;

        assert!(f.engine.events_rx.try_recv().is_err());
        assert_eq!(f.engine.session().phase(), Phase::Asked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answers_while_idle_never_score() {
        let mut config = test_config();
        config.react_to_no_question = true;
        let mut f = started(config);

        for text in ["!a paris", "!a nyc", "!a mars", "!a au"] {
            f.engine.handle_event(chat("anna", text));
        }

        settle().await;
        assert!(f.scores.read_all().await.unwrap().is_empty());
        let lines = f.chat.take();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("no open question"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_question_is_silent_by_default() {
        let mut f = started(test_config());
        f.engine.handle_event(chat("anna", "!a paris"));
        f.engine.handle_event(chat("anna", "!question"));
        assert!(f.chat.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_answer_reaction_is_configurable() {
        let mut config = test_config();
        config.react_to_wrong_answer = true;
        let mut f = started(config);

        f.engine.handle_event(Event::QuestionDue);
        f.chat.take();

        f.engine.handle_event(chat("anna", "!a definitely wrong"));
        assert_eq!(f.engine.session().phase(), Phase::Asked);
        assert_eq!(f.chat.take(), vec!["Sorry anna, that is not correct."]);

        // Lines without the prefix are ordinary chat
        f.engine.handle_event(chat("anna", "hello everyone"));
        assert!(f.chat.take().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_bot_skips_questions_and_answers() {
        let mut f = fixture(test_config());

        f.engine.handle_event(Event::QuestionDue);
        assert_eq!(f.engine.session().phase(), Phase::Idle);
        assert!(f.chat.take().is_empty());

        f.engine.handle_event(chat("anna", "!a paris"));
        settle().await;
        assert!(f.scores.read_all().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_keeps_running_while_stopped() {
        let mut f = fixture(test_config());

        for _ in 0..20 {
            f.engine.handle_event(Event::Tick);
        }
        assert_eq!(f.engine.status().seconds_until_next_question, 39);

        f.engine.handle_event(Event::Host(HostRequest::Start));
        let lines = f.chat.take();
        assert!(lines[0].contains("Question interval: 1 minute"));
        assert!(lines[0].contains("next question in 39 seconds"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_expiry_asks_via_queue() {
        let mut f = started(test_config());

        for _ in 0..60 {
            f.engine.handle_event(Event::Tick);
        }
        // The callback only queued the question
        assert_eq!(f.engine.session().phase(), Phase::Idle);

        let event = f.engine.next_event().await.unwrap();
        assert!(matches!(event, Event::QuestionDue));
        f.engine.handle_event(event);
        assert_eq!(f.engine.session().phase(), Phase::Asked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_admin_commands_require_admin() {
        let mut f = fixture(test_config());

        f.engine.handle_event(chat("mallory", "!start"));
        assert!(!f.engine.session().is_running());
        assert!(f.chat.take().is_empty());

        f.engine.handle_event(chat("TheAdmin", "!START"));
        assert!(f.engine.session().is_running());

        f.engine.handle_event(chat("theadmin", "!stop"));
        assert!(!f.engine.session().is_running());
        let lines = f.chat.take();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("Stopping"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_score_commands() {
        let mut f = started(test_config());
        f.scores.increment("anna").await.unwrap();
        f.scores.increment("anna").await.unwrap();
        f.scores.increment("ben").await.unwrap();

        f.engine.handle_event(chat("Anna", "!score"));
        settle().await;
        assert_eq!(f.chat.take(), vec!["anna has 2 points."]);

        f.engine.handle_event(chat("theadmin", "!all"));
        settle().await;
        assert_eq!(f.chat.take(), vec!["anna has 2 points.", "ben has 1 points."]);

        f.engine.handle_event(chat("theadmin", "!reset"));
        settle().await;
        let lines = f.chat.take();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("reset"));
        assert!(f.scores.read_all().await.unwrap().is_empty());

        f.engine.handle_event(chat("theadmin", "!all"));
        settle().await;
        assert_eq!(f.chat.take(), vec!["Nobody has any points yet."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_question_command_reposts() {
        let mut f = started(test_config());
        f.engine.handle_event(Event::QuestionDue);
        let first = f.chat.take();

        f.engine.handle_event(chat("anna", "!question"));
        assert_eq!(f.chat.take(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_question_after_correct_answer() {
        let mut config = test_config();
        config.react_to_no_question = true;
        let mut f = started(config);

        f.engine.handle_event(Event::QuestionDue);
        let question = f.engine.session().active_question().unwrap().clone();
        f.engine
            .handle_event(chat("anna", &format!("!a {}", question.canonical_answer())));
        settle().await;
        f.chat.take();

        f.engine.handle_event(chat("ben", "!question"));
        let lines = f.chat.take();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("no open question"));
        assert!(!lines[0].contains(&question.prompt));
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_question_supersedes_open_one() {
        let mut config = test_config();
        // One question of cooldown guarantees a different second question
        config.question_cooldown_percent = 0.25;
        let mut f = started(config);
        f.engine.handle_event(Event::QuestionDue);
        let first = f.engine.session().active_question().unwrap().index;

        f.engine.handle_event(Event::QuestionDue);
        let second = f.engine.session().active_question().unwrap().index;
        assert_ne!(first, second);

        // Only the second question's window can fire
        let event = f.engine.next_event().await.unwrap();
        f.engine.handle_event(event);
        assert_eq!(f.engine.session().phase(), Phase::Idle);
        assert!(f.engine.events_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_requests() {
        let mut f = fixture(test_config());
        let handle = f.engine.handle();

        assert!(handle.start());
        assert!(handle.submit_answer("Anna", "!a paris"));
        let event = f.engine.next_event().await.unwrap();
        f.engine.handle_event(event);
        assert!(f.engine.session().is_running());

        let event = f.engine.next_event().await.unwrap();
        f.engine.handle_event(event);

        let (tx, rx) = oneshot::channel();
        f.engine.handle_event(Event::Host(HostRequest::Status(tx)));
        let status = rx.await.unwrap();
        assert!(status.running);
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(status.pool_size, 4);
        assert_eq!(status.seconds_until_next_question, 59);
    }

    #[test]
    fn test_mismatched_selector_is_rejected() {
        let config = test_config();
        let selector = CooldownSelector::seeded(10, 0.0, 1).unwrap();
        let result = QuizEngine::new(
            config,
            pool(),
            selector,
            Locale::default(),
            Arc::new(RecordingChat::default()),
            Arc::new(MemoryScoreStore::new()),
        );
        assert!(matches!(result, Err(QuizError::InvalidConfiguration(_))));
    }
}
