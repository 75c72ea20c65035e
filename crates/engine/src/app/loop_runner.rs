use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::assets::AssetManifest;

use super::input::ActionStates;
use super::scene::{SceneLoadError, SceneMachine};
use super::tools::{ConsoleCommandProcessor, ConsoleState, DebugCommand};
use super::{
    InputAction, InputSnapshot, Renderer, Scene, SceneCommand, SceneDebugCommandResult, SceneKey,
    Viewport,
};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub internal_width: u32,
    pub internal_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    pub start_scene: SceneKey,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Deswonder".to_string(),
            window_width: 1280,
            window_height: 960,
            internal_width: 320,
            internal_height: 240,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: Some(60),
            start_scene: SceneKey::Title,
        }
    }
}

impl LoopConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport {
            width: self.internal_width.max(1),
            height: self.internal_height.max(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("failed to load start scene: {0}")]
    SceneLoad(#[from] SceneLoadError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(
    config: LoopConfig,
    assets: Arc<AssetManifest>,
    title_scene: Box<dyn Scene>,
    field_scene: Box<dyn Scene>,
) -> Result<(), AppError> {
    let viewport = config.viewport();
    let mut scenes = SceneMachine::new(title_scene, field_scene, config.start_scene);
    scenes.configure_worlds(viewport, assets);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer =
        Renderer::new(Arc::clone(&window), viewport).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);

    scenes.load_active()?;
    info!(scene = ?scenes.active_scene(), "scene_loaded");
    info!(
        target_tps,
        internal_width = viewport.width,
        internal_height = viewport.height,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut input_collector = InputCollector::default();
    let mut console = ConsoleState::default();
    let mut command_processor = ConsoleCommandProcessor::new();
    let mut pending_debug_commands = Vec::new();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut loop_counters = LoopCounters::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if is_console_toggle_key(&event) {
                        console.toggle_open();
                        input_collector.release_all();
                        scenes.set_debug_console_open_active(console.is_open());
                        info!(open = console.is_open(), "debug_console_toggled");
                    } else if console.is_open() {
                        console.handle_key_event(&event);
                        if !console.is_open() {
                            scenes.set_debug_console_open_active(false);
                        }
                    } else {
                        input_collector.handle_keyboard_input(&event);
                    }
                }
                WindowEvent::RedrawRequested => {
                    command_processor.process_pending_lines(&mut console);
                    command_processor
                        .drain_pending_debug_commands_into(&mut pending_debug_commands);
                    for command in pending_debug_commands.drain(..) {
                        if apply_debug_command(&mut scenes, &mut console, command) {
                            info!(reason = "console_quit", "shutdown_requested");
                            window_target.exit();
                        }
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                    accumulator = accumulator.saturating_add(clamped_frame_dt);

                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = scenes.update_active(fixed_dt_seconds, &input_snapshot);
                        let switch_result = match command {
                            SceneCommand::SwitchTo(next_scene) => scenes.switch_to(next_scene),
                            SceneCommand::HardResetTo(next_scene) => {
                                scenes.hard_reset_to(next_scene)
                            }
                            SceneCommand::Quit => {
                                info!(reason = "scene_quit", "shutdown_requested");
                                window_target.exit();
                                Ok(false)
                            }
                            SceneCommand::None => Ok(false),
                        };
                        if let Err(error) = switch_result {
                            warn!(
                                error = %error,
                                scene = ?scenes.active_scene(),
                                "scene_switch_failed"
                            );
                        }
                        loop_counters.record_tick();
                    }
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    scenes.render_active();
                    let console_for_frame = console.is_open().then_some(&console);
                    if let Err(error) =
                        renderer.render_world(scenes.active_world(), console_for_frame)
                    {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = scenes.debug_title_active();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }

                    loop_counters.record_frame();
                    if let Some((fps, tps)) = loop_counters.maybe_rates(now) {
                        info!(fps, tps, scene = ?scenes.active_scene(), "loop_metrics");
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scenes.shutdown_all();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Applies one console command. Returns true when the app should exit.
fn apply_debug_command(
    scenes: &mut SceneMachine,
    console: &mut ConsoleState,
    command: DebugCommand,
) -> bool {
    match command {
        DebugCommand::Quit => return true,
        DebugCommand::ResetScene => match scenes.hard_reset_to(scenes.active_scene()) {
            Ok(_) => console.append_output(format!("reset {:?}", scenes.active_scene())),
            Err(error) => console.append_output(format!("error: {error}")),
        },
        DebugCommand::SwitchScene { scene } => match scenes.switch_to(scene) {
            Ok(true) => console.append_output(format!("switched to {scene:?}")),
            Ok(false) => console.append_output(format!("already in {scene:?}")),
            Err(error) => console.append_output(format!("error: {error}")),
        },
        DebugCommand::Scene(scene_command) => {
            match scenes.execute_debug_command_active(scene_command) {
                SceneDebugCommandResult::Success(message) => console.append_output(message),
                SceneDebugCommandResult::Error(message) => {
                    console.append_output(format!("error: {message}"))
                }
                SceneDebugCommandResult::Unsupported => {
                    console.append_output("error: not available in this scene")
                }
            }
        }
    }
    false
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        for action in actions_for_key(code) {
            self.action_states.set(*action, is_pressed);
        }
    }

    /// Drops held keys so nothing stays stuck while the console swallows input.
    fn release_all(&mut self) {
        self.action_states.clear_all();
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(self.quit_requested, self.action_states);
        self.action_states.clear_pressed();
        snapshot
    }
}

fn actions_for_key(code: KeyCode) -> &'static [InputAction] {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => &[InputAction::MoveUp],
        KeyCode::KeyS | KeyCode::ArrowDown => &[InputAction::MoveDown],
        KeyCode::KeyA | KeyCode::ArrowLeft => &[InputAction::MoveLeft],
        KeyCode::KeyD | KeyCode::ArrowRight => &[InputAction::MoveRight],
        KeyCode::KeyE => &[InputAction::Interact],
        KeyCode::Enter | KeyCode::NumpadEnter => &[InputAction::Confirm, InputAction::SkipDialog],
        KeyCode::Space => &[InputAction::Confirm],
        KeyCode::KeyX => &[InputAction::SkipDialog],
        KeyCode::Escape | KeyCode::Backspace => &[InputAction::Cancel],
        KeyCode::KeyI => &[InputAction::ToggleInventory],
        _ => &[],
    }
}

fn is_console_toggle_key(key_event: &KeyEvent) -> bool {
    key_event.state == ElementState::Pressed
        && !key_event.repeat
        && matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::F1))
}

#[derive(Debug)]
struct LoopCounters {
    interval: Duration,
    window_start: Instant,
    ticks: u32,
    frames: u32,
}

impl LoopCounters {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            window_start: Instant::now(),
            ticks: 0,
            frames: 0,
        }
    }

    fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    fn record_frame(&mut self) {
        self.frames = self.frames.saturating_add(1);
    }

    fn maybe_rates(&mut self, now: Instant) -> Option<(f32, f32)> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.interval {
            return None;
        }
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let rates = (self.frames as f32 / seconds, self.ticks as f32 / seconds);
        self.window_start = now;
        self.ticks = 0;
        self.frames = 0;
        Some(rates)
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), true);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), false);
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(50), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn interact_press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyE);

        let first = input.snapshot_for_tick();
        press(&mut input, KeyCode::KeyE);
        let second = input.snapshot_for_tick();
        release(&mut input, KeyCode::KeyE);
        press(&mut input, KeyCode::KeyE);
        let third = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::Interact));
        assert!(!second.was_pressed(InputAction::Interact));
        assert!(second.is_down(InputAction::Interact));
        assert!(third.was_pressed(InputAction::Interact));
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_movement() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyW);
        press(&mut input, KeyCode::ArrowLeft);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveUp));
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(!snapshot.is_down(InputAction::MoveRight));
    }

    #[test]
    fn enter_confirms_and_skips_dialog() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Enter);
        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.was_pressed(InputAction::Confirm));
        assert!(snapshot.was_pressed(InputAction::SkipDialog));
        assert!(!snapshot.was_pressed(InputAction::Interact));
    }

    #[test]
    fn release_all_clears_held_keys() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyD);
        input.release_all();
        let snapshot = input.snapshot_for_tick();
        assert!(!snapshot.is_down(InputAction::MoveRight));
        assert!(!snapshot.was_pressed(InputAction::MoveRight));
    }

    #[test]
    fn quit_request_is_sticky() {
        let mut input = InputCollector::default();
        input.mark_quit_requested();
        assert!(input.snapshot_for_tick().quit_requested());
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert!(actions_for_key(KeyCode::KeyQ).is_empty());
        assert_eq!(actions_for_key(KeyCode::KeyI), &[InputAction::ToggleInventory]);
    }

    #[test]
    fn loop_counters_report_once_per_interval() {
        let mut counters = LoopCounters::new(Duration::from_secs(1));
        let start = counters.window_start;
        counters.record_tick();
        counters.record_frame();
        assert!(counters.maybe_rates(start).is_none());
        let (fps, tps) = counters
            .maybe_rates(start + Duration::from_secs(2))
            .expect("rates after interval");
        assert!((fps - 0.5).abs() < 1e-4);
        assert!((tps - 0.5).abs() < 1e-4);
        assert_eq!(counters.ticks, 0);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }

    #[test]
    fn default_config_uses_internal_resolution() {
        let config = LoopConfig::default();
        assert_eq!(
            config.viewport(),
            Viewport {
                width: 320,
                height: 240
            }
        );
        assert_eq!(config.window_width / config.internal_width, 4);
    }
}
