use std::cell::RefCell;
use std::rc::Rc;

use super::{seconds_to_ticks, Interpreter, EVENT_GRACE_TICKS};
use crate::command::Directive;
use crate::error::ScriptError;
use crate::events::{InputEvent, KEY_ESCAPE};
use crate::host::{FinaleHost, MobjSounds, StateInfo};
use crate::operand::ResourceUri;
use crate::widget::{Animator, FrameImage, WidgetKind};

const SOUNDS: [&str; 4] = ["one", "two", "three", "four"];

/// Host that resolves a fixed set of names and records every call-out.
#[derive(Debug, Default)]
struct TestHost {
    calls: RefCell<Vec<String>>,
    netgame: bool,
    mode: String,
    client: bool,
}

impl TestHost {
    fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn sounds(&self) -> Vec<i32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| call.strip_prefix("sound "))
            .filter_map(|id| id.parse().ok())
            .collect()
    }
}

impl FinaleHost for TestHost {
    fn resolve_sound(&self, name: &str) -> Option<i32> {
        SOUNDS
            .iter()
            .position(|sound| sound.eq_ignore_ascii_case(name))
            .map(|index| index as i32 + 1)
    }

    fn resolve_music(&self, name: &str) -> Option<i32> {
        name.eq_ignore_ascii_case("e1m1").then_some(9)
    }

    fn resolve_mobj_type(&self, name: &str) -> Option<MobjSounds> {
        name.eq_ignore_ascii_case("imp").then_some(MobjSounds {
            see_sound: 2,
            death_sound: 3,
        })
    }

    fn resolve_material(&self, uri: &ResourceUri) -> Option<i32> {
        let flat = uri.scheme.as_deref() == Some("Flats");
        (flat && uri.path.eq_ignore_ascii_case("FLOOR4_8")).then_some(1)
    }

    fn resolve_font(&self, uri: &ResourceUri) -> Option<i32> {
        let game = uri.scheme.as_deref() == Some("Game");
        (game && uri.path.eq_ignore_ascii_case("Small")).then_some(4)
    }

    fn resolve_state(&self, name: &str) -> Option<i32> {
        name.eq_ignore_ascii_case("S_PLAY").then_some(1)
    }

    fn state_info(&self, state: i32) -> Option<StateInfo> {
        match state {
            1 => Some(StateInfo {
                sprite: 5,
                frame: 0,
                tics: 4,
                next_state: 2,
                flip: false,
            }),
            2 => Some(StateInfo {
                sprite: 5,
                frame: 1,
                tics: -1,
                next_state: 0,
                flip: true,
            }),
            _ => None,
        }
    }

    fn text_definition(&self, id: &str) -> Option<String> {
        (id == "greeting").then(|| "Hello".to_string())
    }

    fn evaluate_condition(&self, token: &str) -> Option<bool> {
        match token {
            "yes" => Some(true),
            "no" => Some(false),
            _ => None,
        }
    }

    fn is_netgame(&self) -> bool {
        self.netgame
    }

    fn game_mode(&self) -> &str {
        &self.mode
    }

    fn is_client(&self) -> bool {
        self.client
    }

    fn play_sound(&self, sound: i32, _volume: f32) {
        self.record(format!("sound {sound}"));
    }

    fn play_music(&self, music: i32, looped: bool) {
        self.record(format!("music {music} looped={looped}"));
    }

    fn stop_music(&self) {
        self.record("music off".to_string());
    }

    fn play_demo(&self, path: &str) {
        self.record(format!("demo {path}"));
    }

    fn broadcast_skip(&self, finale: u32) {
        self.record(format!("broadcast {finale}"));
    }

    fn request_skip(&self, finale: u32) {
        self.record(format!("request {finale}"));
    }

    fn finale_stopped(&self, finale: u32) {
        self.record(format!("stopped {finale}"));
    }
}

fn start(script: &str, host: &Rc<TestHost>) -> Interpreter {
    Interpreter::load(7, script, Rc::clone(host) as Rc<dyn FinaleHost>).expect("script loads")
}

fn tick(interpreter: &mut Interpreter) -> bool {
    interpreter.run_ticks(true).expect("tick succeeds")
}

/// Ticks until the script ends and returns the tick it ended on.
fn run_to_end(interpreter: &mut Interpreter, limit: u32) -> u32 {
    for n in 1..=limit {
        if tick(interpreter) {
            return n;
        }
    }
    panic!("script still running after {limit} ticks");
}

fn run_script(script: &str) -> Vec<i32> {
    let host = TestHost::shared();
    let mut interpreter = start(script, &host);
    run_to_end(&mut interpreter, 1000);
    host.sounds()
}

#[test]
fn waittext_holds_until_type_in_completes() {
    let host = TestHost::shared();
    let mut interpreter = start("text id 0 0 \"Hello\"\nwaittext id\nend", &host);

    for n in 1..14 {
        assert!(!tick(&mut interpreter), "ended early on tick {n}");
        assert_eq!(interpreter.waiting_text(), Some("id"));
    }
    // Type-in finishes on tick 14 and END runs; the script ends a tick later.
    assert!(!tick(&mut interpreter));
    assert_eq!(interpreter.waiting_text(), None);
    assert!(tick(&mut interpreter));
    assert!(interpreter.is_stopped());
    assert_eq!(host.calls(), vec!["stopped 7".to_string()]);
}

#[test]
fn goto_resumes_after_first_matching_marker() {
    assert_eq!(
        run_script("sound one goto b marker a sound two marker B sound three"),
        vec![1, 3]
    );
}

#[test]
fn empty_goto_target_is_ignored() {
    assert_eq!(run_script("goto \"\" sound one"), vec![1]);
}

#[test]
fn else_runs_only_after_a_skipped_command() {
    assert_eq!(run_script("if no sound one else sound two"), vec![2]);
    assert_eq!(run_script("if yes sound one else sound two"), vec![1]);
}

#[test]
fn unknown_condition_is_false() {
    assert_eq!(run_script("if whatever sound one sound two"), vec![2]);
}

#[test]
fn ifnot_inverts_builtin_conditions() {
    for (netgame, expected) in [(false, vec![1, 2]), (true, vec![2])] {
        let host = Rc::new(TestHost {
            netgame,
            ..TestHost::default()
        });
        let mut interpreter = start("ifnot netgame sound one sound two", &host);
        run_to_end(&mut interpreter, 10);
        assert_eq!(host.sounds(), expected, "netgame = {netgame}");
    }

    let host = Rc::new(TestHost {
        mode: "doom2".to_string(),
        ..TestHost::default()
    });
    let mut interpreter = start(
        "ifnot mode:DOOM2 sound one if mode:doom2 sound two ifnot mode:heretic sound three",
        &host,
    );
    run_to_end(&mut interpreter, 10);
    assert_eq!(host.sounds(), vec![2, 3]);
}

#[test]
fn true_condition_runs_do_block() {
    assert_eq!(
        run_script("if yes do sound one sound two ; sound three"),
        vec![1, 2, 3]
    );
}

#[test]
fn false_condition_skips_nested_do_blocks() {
    assert_eq!(
        run_script("if no do sound one do sound two ; ; sound three"),
        vec![3]
    );
    // Everything up to the outer block's semicolon belongs to it.
    assert_eq!(
        run_script("if no do sound one do sound two ; sound three ; sound four"),
        vec![4]
    );
}

#[test]
fn wait_resumes_after_one_second_without_repeating() {
    let host = TestHost::shared();
    let mut interpreter = start("wait 1.0 sound one", &host);
    let one_second = seconds_to_ticks(1.0);
    assert_eq!(one_second, 35);

    assert!(!tick(&mut interpreter));
    assert_eq!(interpreter.wait_ticks(), one_second);
    for _ in 1..one_second {
        assert!(!tick(&mut interpreter));
    }
    assert!(host.sounds().is_empty());

    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![1]);
    assert_eq!(interpreter.timer(), one_second + 1);
}

#[test]
fn skip_without_permission_changes_nothing() {
    let host = TestHost::shared();
    let mut interpreter = start("noskip noevents wait 10", &host);
    tick(&mut interpreter);

    let flow = interpreter.flow().clone();
    let wait = interpreter.wait_ticks();
    assert!(!interpreter.can_skip());
    assert!(!interpreter.eats_events());
    assert!(!interpreter.skip());
    assert_eq!(interpreter.flow(), &flow);
    assert_eq!(interpreter.wait_ticks(), wait);
    assert!(!interpreter.is_paused());
}

#[test]
fn skip_with_events_eaten_reports_consumed() {
    let host = TestHost::shared();
    let mut interpreter = start("noskip events wait 10", &host);
    tick(&mut interpreter);
    assert!(interpreter.skip());
    assert!(!interpreter.flow().skipping);
}

#[test]
fn free_skip_runs_to_skiphere() {
    let host = TestHost::shared();
    let mut interpreter = start("wait 100 sound one skiphere sound two", &host);
    tick(&mut interpreter);
    assert!(interpreter.skip());
    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![2]);
}

#[test]
fn skip_first_finishes_waited_text() {
    let host = TestHost::shared();
    let mut interpreter = start("text t 0 0 \"long text here\" waittext t sound one", &host);
    tick(&mut interpreter);
    assert!(interpreter.skip());
    assert!(!interpreter.flow().skipping);

    assert!(!tick(&mut interpreter));
    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn skip_unpauses() {
    let host = TestHost::shared();
    let mut interpreter = start("pause sound one", &host);
    assert!(!tick(&mut interpreter));
    assert!(interpreter.is_paused());
    assert!(!tick(&mut interpreter));

    assert!(interpreter.skip());
    assert!(!interpreter.is_paused());
    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn widget_lookup_round_trips() {
    let host = TestHost::shared();
    let mut interpreter = start("wait 1", &host);
    interpreter.pages_mut().find_or_create(WidgetKind::Text, "caption");
    interpreter.pages_mut().find_or_create(WidgetKind::Text, "caption");
    assert_eq!(interpreter.pages().texts.widgets.len(), 1);
}

#[test]
fn onload_block_runs_at_load() {
    let host = TestHost::shared();
    let mut interpreter = start("OnLoad { sound one } sound two goto x marker x", &host);
    assert_eq!(host.sounds(), vec![1]);
    run_to_end(&mut interpreter, 10);
    assert_eq!(host.sounds(), vec![1, 2]);
}

#[test]
fn onload_rejects_waiting_commands() {
    let host = TestHost::shared();
    let err = Interpreter::load(1, "OnLoad { wait 1 } sound one", host.clone()).unwrap_err();
    assert_eq!(
        err,
        ScriptError::DirectiveViolation {
            command: "WAIT",
            directive: Directive::OnLoad,
        }
    );
    assert_eq!(host.calls(), vec!["stopped 1".to_string()]);
}

#[test]
fn onload_must_be_closed() {
    let host = TestHost::shared();
    let err = Interpreter::load(1, "OnLoad { sound one", host).unwrap_err();
    assert_eq!(
        err,
        ScriptError::UnterminatedDirective {
            directive: Directive::OnLoad
        }
    );
}

#[test]
fn missing_operand_stops_the_script() {
    let host = TestHost::shared();
    let mut interpreter = start("sound one sound", &host);
    let err = interpreter.run_ticks(true).unwrap_err();
    assert_eq!(
        err,
        ScriptError::MissingOperand {
            command: "SOUND",
            index: 0
        }
    );
    assert!(interpreter.is_stopped());
    assert_eq!(host.calls(), vec!["sound 1".to_string(), "stopped 7".to_string()]);
    assert!(tick(&mut interpreter));
}

#[test]
fn unknown_commands_are_ignored() {
    assert_eq!(run_script("frobnicate sound one"), vec![1]);
}

#[test]
fn end_stops_on_the_following_tick() {
    let host = TestHost::shared();
    let mut interpreter = start("sound one end sound two", &host);
    assert!(!tick(&mut interpreter));
    assert!(!interpreter.is_stopped());
    assert!(tick(&mut interpreter));
    assert!(interpreter.is_stopped());
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn request_end_applies_at_next_tick() {
    let host = TestHost::shared();
    let mut interpreter = start("pause sound one", &host);
    assert!(!tick(&mut interpreter));
    interpreter.request_end();
    assert!(tick(&mut interpreter));
    assert!(host.sounds().is_empty());
}

#[test]
fn input_is_ignored_during_grace_period() {
    let host = TestHost::shared();
    let mut interpreter = start("onkey escape done wait 100 marker done sound one", &host);
    tick(&mut interpreter);
    assert_eq!(interpreter.event_handlers().len(), 1);
    assert!(!interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));
    assert_eq!(interpreter.wait_ticks(), 100);

    while interpreter.timer() < EVENT_GRACE_TICKS {
        tick(&mut interpreter);
    }
    interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE));
    assert_eq!(interpreter.wait_ticks(), 0);
    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn key_press_after_grace_skips_on_server() {
    let host = TestHost::shared();
    let mut interpreter = start("wait 100 sound one skiphere sound two", &host);
    for _ in 0..EVENT_GRACE_TICKS {
        tick(&mut interpreter);
    }
    assert!(!interpreter.handle_event(&InputEvent::key_up(' ' as i32)));
    assert!(interpreter.handle_event(&InputEvent::key_down(' ' as i32)));
    assert!(tick(&mut interpreter));
    assert_eq!(host.calls()[0], "broadcast 7");
    assert_eq!(host.sounds(), vec![2]);
}

#[test]
fn client_forwards_skip_requests() {
    let host = Rc::new(TestHost {
        client: true,
        ..TestHost::default()
    });
    let mut interpreter = start("wait 100", &host);
    for _ in 0..EVENT_GRACE_TICKS {
        tick(&mut interpreter);
    }
    let wait = interpreter.wait_ticks();
    assert!(interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));
    assert_eq!(host.calls(), vec!["request 7".to_string()]);
    assert_eq!(interpreter.wait_ticks(), wait);
}

#[test]
fn playdemo_suspends_until_resumed() {
    let host = TestHost::shared();
    let mut interpreter = start("playdemo demo1.lmp sound one", &host);
    assert!(!tick(&mut interpreter));
    assert!(interpreter.is_suspended());
    assert_eq!(host.calls(), vec!["demo demo1.lmp".to_string()]);

    assert!(!tick(&mut interpreter));
    assert!(host.sounds().is_empty());
    assert!(!interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));

    interpreter.resume();
    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn pages_appear_with_first_command() {
    let host = TestHost::shared();
    let mut interpreter = start("wait 1 wait 1", &host);
    assert!(!interpreter.pages().anims.visible);
    tick(&mut interpreter);
    assert!(interpreter.pages().anims.visible);
    assert!(interpreter.pages().texts.visible);
    assert!(interpreter.command_executed());

    interpreter.suspend();
    assert!(!interpreter.pages().texts.visible);
    interpreter.resume();
    assert!(interpreter.pages().texts.visible);

    interpreter.stop();
    assert!(!interpreter.pages().anims.visible);
}

#[test]
fn missing_text_sources_use_placeholders() {
    let host = TestHost::shared();
    let mut interpreter = start(
        "textdef a 0 0 greeting textdef b 0 0 nosuch textlump c 0 0 nolump wait 1",
        &host,
    );
    tick(&mut interpreter);
    let text = |name: &str| {
        interpreter
            .pages()
            .texts
            .find(name)
            .and_then(|widget| widget.as_text())
            .map(|text| text.text.clone())
    };
    assert_eq!(text("a").as_deref(), Some("Hello"));
    assert_eq!(text("b").as_deref(), Some("(undefined)"));
    assert_eq!(text("c").as_deref(), Some("(not found)"));
}

#[test]
fn object_commands_do_not_create_widgets() {
    let host = TestHost::shared();
    let mut interpreter = start("x ghost 10 alpha ghost 0 wait 1", &host);
    tick(&mut interpreter);
    assert!(interpreter.pages().try_find("ghost").is_none());
}

#[test]
fn in_time_interpolates_object_moves() {
    let host = TestHost::shared();
    let mut interpreter = start("rect r 0 0 10 10 in 1 x r 35 wait 2", &host);
    tick(&mut interpreter);
    let x = |interpreter: &Interpreter| {
        interpreter.pages().try_find("r").map(|widget| widget.base().pos[0])
    };
    let pos = x(&interpreter).expect("rect exists");
    assert_eq!(pos.target, 35.0);
    assert_eq!(pos.steps, 35);
    tick(&mut interpreter);
    assert_eq!(x(&interpreter).map(|pos| pos.value), Some(1.0));
}

#[test]
fn rect_fill_color_targets_one_end() {
    let host = TestHost::shared();
    let mut interpreter = start("rect r 0 0 10 10 fillcolor r top 1 0 0 1 wait 1", &host);
    tick(&mut interpreter);
    let anim = interpreter
        .pages()
        .anims
        .find("r")
        .and_then(|widget| widget.as_anim())
        .expect("rect exists");
    assert!(anim.is_rect);
    assert_eq!(anim.base.color.map(|c| c.value), [1.0, 0.0, 0.0, 1.0]);
    assert_eq!(anim.other_color.map(|c| c.value), [1.0; 4]);
}

#[test]
fn states_follow_the_state_chain() {
    let host = TestHost::shared();
    let mut interpreter = start("states p S_PLAY 5 wait 1", &host);
    tick(&mut interpreter);
    let anim = interpreter
        .pages()
        .anims
        .find("p")
        .and_then(|widget| widget.as_anim())
        .expect("anim exists");
    let frames: Vec<_> = anim
        .frames
        .iter()
        .map(|frame| (frame.image.clone(), frame.tics, frame.flip))
        .collect();
    assert_eq!(
        frames,
        vec![
            (FrameImage::Sprite { sprite: 5, frame: 0 }, 4, false),
            (FrameImage::Sprite { sprite: 5, frame: 1 }, 1, true),
        ]
    );
}

#[test]
fn waitanim_holds_until_frames_play_out() {
    let host = TestHost::shared();
    let mut interpreter = start("anim a p1 0.1 anim a p2 0.1 waitanim a sound one", &host);
    let mut ticks = 1;
    while !tick(&mut interpreter) {
        ticks += 1;
        assert!(ticks < 100);
    }
    assert!(ticks > 4);
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn repeating_anim_releases_waitanim_after_one_cycle() {
    let host = TestHost::shared();
    let mut interpreter = start("anim a p1 0.1 anim a p2 0.1 repeat a waitanim a sound one", &host);
    run_to_end(&mut interpreter, 100);
    assert_eq!(host.sounds(), vec![1]);
}

#[test]
fn grace_period_counts_suspended_ticks() {
    let host = TestHost::shared();
    let mut interpreter = start("wait 100 sound one skiphere sound two", &host);
    interpreter.suspend();
    for _ in 0..EVENT_GRACE_TICKS / 2 {
        assert!(!tick(&mut interpreter));
    }
    for _ in 0..EVENT_GRACE_TICKS / 2 {
        assert!(!interpreter.run_ticks(false).expect("tick succeeds"));
    }
    assert_eq!(interpreter.timer(), EVENT_GRACE_TICKS);

    interpreter.resume();
    assert!(interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));
    assert!(tick(&mut interpreter));
    assert_eq!(host.sounds(), vec![2]);
}

#[test]
fn unsetkey_falls_back_to_plain_skip() {
    let host = TestHost::shared();
    let script = "onkey escape done unsetkey escape wait 100 sound one skiphere \
                  sound two marker done sound three";
    let mut interpreter = start(script, &host);
    while interpreter.timer() < EVENT_GRACE_TICKS {
        tick(&mut interpreter);
    }
    assert!(interpreter.event_handlers().is_empty());

    assert!(interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));
    assert!(interpreter.flow().skipping);
    assert!(tick(&mut interpreter));
    assert_eq!(host.calls()[0], "broadcast 7");
    assert_eq!(host.sounds(), vec![2, 3]);
}

#[test]
fn trigger_toggles_menu_passthrough() {
    let host = TestHost::shared();
    let mut interpreter = start("notrigger wait 1 trigger wait 1", &host);
    assert!(interpreter.is_menu_trigger());
    tick(&mut interpreter);
    assert!(!interpreter.is_menu_trigger());
    tick(&mut interpreter);
    assert!(interpreter.is_menu_trigger());
}

#[test]
fn events_decides_whether_key_handlers_eat_input() {
    let host = TestHost::shared();
    let mut interpreter = start(
        "onkey escape done events wait 100 marker done noevents wait 100",
        &host,
    );
    while interpreter.timer() < EVENT_GRACE_TICKS {
        tick(&mut interpreter);
    }
    assert!(interpreter.eats_events());
    assert!(interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));

    // Rescans to the marker and runs NOEVENTS.
    tick(&mut interpreter);
    assert!(!interpreter.eats_events());
    assert_eq!(interpreter.wait_ticks(), 100);
    assert!(!interpreter.handle_event(&InputEvent::key_down(KEY_ESCAPE)));
    assert!(host.calls().iter().all(|call| !call.starts_with("broadcast")));
}

#[test]
fn thing_and_music_commands_reach_the_host() {
    let host = TestHost::shared();
    let mut interpreter = start(
        "seesound imp diesound imp seesound nobody musiconce e1m1 music E1M1 music nosuch nomusic",
        &host,
    );
    run_to_end(&mut interpreter, 10);
    assert_eq!(
        host.calls(),
        vec![
            "sound 2".to_string(),
            "sound 3".to_string(),
            "music 9 looped=false".to_string(),
            "music 9 looped=true".to_string(),
            "music off".to_string(),
            "stopped 7".to_string(),
        ]
    );
}

#[test]
fn background_and_font_names_take_default_schemes() {
    let host = TestHost::shared();
    let mut interpreter = start(
        "flat floor4_8 prefont 2 small wait 1 texture nosuch wait 1",
        &host,
    );
    tick(&mut interpreter);
    assert_eq!(
        interpreter.pages().anims.background,
        Some(ResourceUri {
            scheme: Some("Flats".to_string()),
            path: "floor4_8".to_string(),
        })
    );
    let font = interpreter.pages().texts.predefined_font(2).cloned();
    assert_eq!(font, Some(ResourceUri::parse("Game:small", None)));
    assert_eq!(interpreter.pages().texts.predefined_font(1), None);

    // An unknown material clears the background instead of keeping a stale one.
    tick(&mut interpreter);
    assert_eq!(interpreter.pages().anims.background, None);
}

#[test]
fn color_and_filter_set_page_state() {
    let host = TestHost::shared();
    let mut interpreter = start("color 0.5 0.25 0 filter 1 0 0 0.5 wait 1", &host);
    tick(&mut interpreter);
    fn values(animators: &[Animator]) -> Vec<f32> {
        animators.iter().map(|animator| animator.value).collect()
    }
    let pages = interpreter.pages();
    assert_eq!(values(&pages.anims.bg_top_color), vec![0.5, 0.25, 0.0, 0.0]);
    assert_eq!(values(&pages.anims.bg_bottom_color), vec![0.5, 0.25, 0.0, 0.0]);
    assert_eq!(values(&pages.texts.filter), vec![1.0, 0.0, 0.0, 0.5]);
}
