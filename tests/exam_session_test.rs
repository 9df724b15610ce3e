//! 考试状态机集成测试
//!
//! 用脚本化的播报器和播放器驱动 ExamSession，验证两遍制听力
//! 考试的推进规则：越线触发、暂停仲裁、倒计时、换 Part、收卷。

use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::future::BoxFuture;
use listening_mock_exam::infrastructure::player::MediaPlayer;
use listening_mock_exam::models::exam::{
    AnswerSheet, ExamData, GeneratedPart, PartKind, Question, QuestionKind,
};
use listening_mock_exam::models::source::MediaReference;
use listening_mock_exam::services::narration::NarrationGate;
use listening_mock_exam::workflow::exam_session::{ExamSession, ExamState};

/// 脚本化播报器：记录每次播报，可配置为全部失败
struct ScriptedNarrator {
    spoken: Arc<Mutex<Vec<String>>>,
    paused_calls: Arc<Mutex<Vec<bool>>>,
    fail_all: bool,
}

impl ScriptedNarrator {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                spoken: spoken.clone(),
                paused_calls: Arc::new(Mutex::new(Vec::new())),
                fail_all: false,
            },
            spoken,
        )
    }

    fn failing() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
            paused_calls: Arc::new(Mutex::new(Vec::new())),
            fail_all: true,
        }
    }
}

impl NarrationGate for ScriptedNarrator {
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<()>> {
        let spoken = self.spoken.clone();
        let fail = self.fail_all;
        let text = text.to_string();
        Box::pin(async move {
            spoken.lock().unwrap().push(text);
            if fail {
                anyhow::bail!("speech synthesis unavailable")
            }
            Ok(())
        })
    }

    fn set_paused(&self, paused: bool) {
        self.paused_calls.lock().unwrap().push(paused);
    }
}

/// 脚本化播放器：只记录收到的命令
#[derive(Debug, Clone, PartialEq)]
enum PlayerCmd {
    Load(String),
    Seek(f64),
    SetPlaying(bool),
}

struct ScriptedPlayer {
    commands: Arc<Mutex<Vec<PlayerCmd>>>,
}

impl ScriptedPlayer {
    fn new() -> (Self, Arc<Mutex<Vec<PlayerCmd>>>) {
        let commands = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                commands: commands.clone(),
            },
            commands,
        )
    }
}

impl MediaPlayer for ScriptedPlayer {
    fn load(&mut self, media: &MediaReference) {
        self.commands
            .lock()
            .unwrap()
            .push(PlayerCmd::Load(media.locator().to_string()));
    }

    fn seek(&mut self, seconds: f64) {
        self.commands.lock().unwrap().push(PlayerCmd::Seek(seconds));
    }

    fn set_playing(&mut self, playing: bool) {
        self.commands
            .lock()
            .unwrap()
            .push(PlayerCmd::SetPlaying(playing));
    }
}

fn question(id: u32, correct: &str) -> Question {
    Question {
        id,
        kind: QuestionKind::FactualMultipleChoice,
        text: format!("question {}", id),
        choices: vec!["x".into(), "y".into()],
        correct_choice: correct.to_string(),
        rationale: String::new(),
        points: 10,
    }
}

fn section(label: &str, start: f64, end: f64) -> GeneratedPart {
    GeneratedPart {
        label: label.to_string(),
        kind: PartKind::Lecture,
        narration: format!("Part {} の放送を始めます。", label),
        media: MediaReference::Remote {
            locator: format!("https://example.com/{}", label),
        },
        start_time: start,
        end_time: end,
        transcript: String::new(),
        questions: vec![question(1, "x")],
        provenance: Vec::new(),
    }
}

fn exam(sections: Vec<GeneratedPart>) -> ExamData {
    ExamData {
        exam_id: "EXAM_TEST".to_string(),
        title: "テスト模試".to_string(),
        sections,
    }
}

type FinishLog = Arc<Mutex<Vec<AnswerSheet>>>;

fn finish_log() -> (FinishLog, Box<dyn FnOnce(AnswerSheet) + Send>) {
    let log: FinishLog = Arc::new(Mutex::new(Vec::new()));
    let log_clone = log.clone();
    let handler = Box::new(move |answers: AnswerSheet| {
        log_clone.lock().unwrap().push(answers);
    });
    (log, handler)
}

#[tokio::test]
async fn test_start_reaches_playing_with_narration_order() {
    let (narrator, spoken) = ScriptedNarrator::new();
    let (player, commands) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 15.0, 120.0)]), narrator, player, 30, handler);
    session.start().await;

    assert_eq!(session.state(), ExamState::Playing);
    assert_eq!(session.lap(), 1);

    // 开场 → 说明 → Part 播报，全部在开播之前
    let spoken = spoken.lock().unwrap();
    assert_eq!(spoken.len(), 3);
    assert!(spoken[2].contains("Part A"));

    // 播报完成后先定位再开播
    let cmds = commands.lock().unwrap();
    let seek_pos = cmds.iter().position(|c| *c == PlayerCmd::Seek(15.0));
    let play_pos = cmds.iter().rposition(|c| *c == PlayerCmd::SetPlaying(true));
    assert!(seek_pos.unwrap() < play_pos.unwrap());
}

#[tokio::test]
async fn test_narration_failure_never_blocks_progress() {
    let (player, _commands) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(
        exam(vec![section("A", 0.0, 60.0)]),
        ScriptedNarrator::failing(),
        player,
        30,
        handler,
    );
    session.start().await;

    // 所有播报都失败，考试照常进入放送
    assert_eq!(session.state(), ExamState::Playing);
}

#[tokio::test]
async fn test_crossing_fires_exactly_once() {
    let (narrator, _) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 100.0)]), narrator, player, 30, handler);
    session.start().await;

    session.handle_progress(99.0).await;
    assert_eq!(session.state(), ExamState::Playing);

    session.handle_progress(100.0).await;
    assert_eq!(session.state(), ExamState::WaitingBetweenLaps);
    assert_eq!(session.wait_remaining(), 30);

    // 同一次越线的后续进度不再触发任何转移
    session.handle_progress(101.0).await;
    session.handle_progress(150.0).await;
    assert_eq!(session.state(), ExamState::WaitingBetweenLaps);
    assert_eq!(session.lap(), 1);
    assert_eq!(session.wait_remaining(), 30);
}

#[tokio::test]
async fn test_nonpositive_end_time_never_auto_cuts() {
    let (narrator, _) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 0.0)]), narrator, player, 30, handler);
    session.start().await;

    for seconds in [10.0, 1000.0, 100000.0] {
        session.handle_progress(seconds).await;
    }
    assert_eq!(session.state(), ExamState::Playing);
}

#[tokio::test]
async fn test_pause_freezes_crossing_and_countdown() {
    let (narrator, _) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 50.0)]), narrator, player, 30, handler);
    session.start().await;

    // 暂停时越线检测不触发
    session.toggle_pause();
    session.handle_progress(60.0).await;
    assert_eq!(session.state(), ExamState::Playing);

    session.toggle_pause();
    session.handle_progress(60.0).await;
    assert_eq!(session.state(), ExamState::WaitingBetweenLaps);

    // 暂停时倒计时不减
    session.toggle_pause();
    session.tick_countdown().await;
    session.tick_countdown().await;
    assert_eq!(session.wait_remaining(), 30);

    session.toggle_pause();
    session.tick_countdown().await;
    assert_eq!(session.wait_remaining(), 29);
}

#[tokio::test]
async fn test_countdown_leads_to_second_lap() {
    let (narrator, spoken) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 20.0, 50.0)]), narrator, player, 3, handler);
    session.start().await;
    session.handle_progress(50.0).await;
    assert_eq!(session.state(), ExamState::WaitingBetweenLaps);

    session.tick_countdown().await;
    session.tick_countdown().await;
    assert_eq!(session.state(), ExamState::WaitingBetweenLaps);
    session.tick_countdown().await;

    // 第二遍：播报固定文案后从起点重新放送
    assert_eq!(session.lap(), 2);
    assert_eq!(session.state(), ExamState::Playing);
    let spoken = spoken.lock().unwrap();
    assert!(spoken.last().unwrap().contains("2回目"));
}

#[tokio::test]
async fn test_second_lap_end_advances_part_and_resets_ready() {
    let (narrator, spoken) = ScriptedNarrator::new();
    let (player, commands) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(
        exam(vec![section("A", 0.0, 50.0), section("B", 5.0, 80.0)]),
        narrator,
        player,
        1,
        handler,
    );
    session.start().await;
    session.handle_ready();
    assert!(session.is_player_ready());

    // 第一遍结束 → 等待 → 第二遍
    session.handle_progress(50.0).await;
    session.tick_countdown().await;
    assert_eq!(session.lap(), 2);

    // 第二遍结束 → 进入 Part B 第一遍
    session.handle_progress(50.0).await;
    assert_eq!(session.part_index(), 1);
    assert_eq!(session.lap(), 1);
    assert_eq!(session.state(), ExamState::Playing);

    // 换 Part 时就绪状态被清掉，播放器被重定向到新媒体
    assert!(!session.is_player_ready());
    let cmds = commands.lock().unwrap();
    assert!(cmds.contains(&PlayerCmd::Load("https://example.com/B".to_string())));
    assert!(cmds.contains(&PlayerCmd::Seek(5.0)));

    let spoken = spoken.lock().unwrap();
    assert!(spoken.last().unwrap().contains("Part B"));
}

#[tokio::test]
async fn test_last_part_second_lap_finishes_with_single_handoff() {
    let (narrator, _) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 40.0)]), narrator, player, 1, handler);
    session.start().await;

    session.record_answer("A", 1, "x");
    session.handle_progress(40.0).await;
    session.tick_countdown().await;
    session.handle_progress(40.0).await;

    assert_eq!(session.state(), ExamState::Finishing);
    assert!(session.is_finished());

    // 再次收卷、再多的进度都不会造成第二次交接
    session.finish().await;
    session.handle_progress(999.0).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].selected("A", 1), Some("x"));
}

#[tokio::test]
async fn test_finish_hands_off_even_when_outro_narration_fails() {
    let (player, _) = ScriptedPlayer::new();
    let (log, handler) = finish_log();

    let mut session = ExamSession::new(
        exam(vec![section("A", 0.0, 40.0)]),
        ScriptedNarrator::failing(),
        player,
        30,
        handler,
    );
    session.start().await;
    session.record_answer("A", 1, "y");

    // 用户随时可以强制收卷；结束播报失败也必须交接
    session.finish().await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].len(), 1);
    assert_eq!(log[0].selected("A", 1), Some("y"));
}

#[tokio::test]
async fn test_record_answer_replaces_and_keeps_state() {
    let (narrator, _) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 40.0)]), narrator, player, 30, handler);
    session.start().await;

    let state_before = session.state();
    session.record_answer("A", 1, "x");
    session.record_answer("A", 1, "y");

    assert_eq!(session.answers().len(), 1);
    assert_eq!(session.answers().selected("A", 1), Some("y"));
    assert_eq!(session.state(), state_before);
}

#[tokio::test]
async fn test_player_error_is_surfaced_without_state_change() {
    let (narrator, _) = ScriptedNarrator::new();
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 40.0)]), narrator, player, 30, handler);
    session.start().await;

    session.handle_player_error("playback failed with error 153");

    let err = session.player_error().expect("错误应被留存");
    assert_eq!(err.kind, listening_mock_exam::ErrorKind::Playback);
    assert_eq!(err.raw_detail, "playback failed with error 153");
    assert_eq!(session.state(), ExamState::Playing);
}

#[tokio::test]
async fn test_pause_propagates_to_narration_channel() {
    let (player, _) = ScriptedPlayer::new();
    let (_log, handler) = finish_log();
    let narrator = ScriptedNarrator::new().0;
    let paused_calls = narrator.paused_calls.clone();

    let mut session = ExamSession::new(exam(vec![section("A", 0.0, 40.0)]), narrator, player, 30, handler);
    session.start().await;

    session.toggle_pause();
    session.toggle_pause();

    assert_eq!(*paused_calls.lock().unwrap(), vec![true, false]);
}
