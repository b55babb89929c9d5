use std::sync::Arc;

use web_time::Instant;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::PhysicalKey,
    window::{Window, WindowId},
};

mod camera;
mod car;
mod config;
mod input;
mod obstacles;
mod physics;
mod race;
mod render;
mod score;
mod supervisor;
mod track;
mod voice;

use camera::ChaseCamera;
use car::{CarEvent, VehicleController};
use config::MAX_FRAME_DT;
use input::InputState;
use obstacles::ObstacleSet;
use physics::PhysicsWorld;
use race::{RaceNotice, RaceStateMachine};
use render::{FrameScene, Renderer};
use score::{FileScoreSink, ScoreSink};
use supervisor::Supervised;
use track::TrackCurve;
use voice::VoiceIntensity;

const SCORE_FILE: &str = "times.log";

struct Game {
    physics: PhysicsWorld,
    curve: TrackCurve,
    input: InputState,
    car: VehicleController,
    obstacles: ObstacleSet,
    chase_camera: ChaseCamera,
    race: RaceStateMachine,
    voice: Option<VoiceIntensity>,
    voice_unit: Supervised,
    scores: FileScoreSink,
    last_frame: Instant,
}

impl Game {
    fn new(now: Instant) -> Self {
        let curve = TrackCurve::course();
        let mut physics = PhysicsWorld::new();
        physics.spawn_track(&curve);
        let body = physics.spawn_car();
        let obstacles = ObstacleSet::course(&mut physics);

        let voice = match VoiceIntensity::start(now) {
            Ok(voice) => Some(voice),
            Err(e) => {
                log::warn!("microphone unavailable, driving without voice boost: {e}");
                None
            }
        };

        Self {
            physics,
            curve,
            input: InputState::new(),
            car: VehicleController::new(body),
            obstacles,
            chase_camera: ChaseCamera::new(body, now),
            race: RaceStateMachine::new(),
            voice,
            voice_unit: Supervised::new("voice capture"),
            scores: FileScoreSink::new(SCORE_FILE),
            last_frame: now,
        }
    }

    /// One simulation step. Returns the scene to draw and the HUD line.
    fn frame(&mut self, now: Instant) -> (FrameScene, String) {
        let dt = now
            .duration_since(self.last_frame)
            .as_secs_f32()
            .min(MAX_FRAME_DT);
        self.last_frame = now;

        let intensity = match self.voice.as_mut() {
            Some(voice) => {
                self.voice_unit.run(|| voice.tick(now));
                if self.voice_unit.is_enabled() {
                    voice.intensity()
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        self.car.update(&mut self.physics, &self.input, intensity);
        self.obstacles.update(&self.curve, &mut self.physics);
        self.physics.step(dt);
        self.car.check_obstacle_contact(&self.physics);

        for event in self.car.take_events() {
            if event == CarEvent::ObstacleHit {
                log::info!("hit an obstacle, back to the start line");
                self.car.reset_to_start(&mut self.physics);
            }
            match self.race.on_event(event, now) {
                Some(RaceNotice::Started) => log::info!("race started"),
                Some(RaceNotice::Finished { millis }) => {
                    log::info!("race finished in {:.2}s", millis as f64 / 1000.0);
                    self.scores.submit(millis);
                }
                None => {}
            }
        }
        self.race.tick(now);
        self.chase_camera.update(&self.physics, now);

        let scene = FrameScene {
            view: self.chase_camera.view_matrix(),
            car: self.physics.pose(self.car.body()),
            obstacles: self.obstacles.positions().collect(),
        };
        (scene, self.race.hud_line(now))
    }
}

struct App {
    renderer: Option<Renderer>,
    game: Game,
}

impl App {
    fn new() -> Self {
        Self {
            renderer: None,
            game: Game::new(Instant::now()),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes().with_title("VoiceKart");
        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match pollster::block_on(Renderer::new(window, &self.game.curve)) {
            Ok(renderer) => {
                renderer.request_redraw();
                self.renderer = Some(renderer);
            }
            Err(e) => {
                log::error!("failed to initialize renderer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize(physical_size.width, physical_size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => self.game.input.handle_key_press(code),
                ElementState::Released => self.game.input.handle_key_release(code),
            },
            WindowEvent::RedrawRequested => {
                let Some(renderer) = &mut self.renderer else {
                    return;
                };

                let now = Instant::now();
                let (scene, hud) = self.game.frame(now);
                renderer
                    .ctx
                    .window
                    .set_title(&format!("VoiceKart - {hud}"));

                match renderer.render_frame(&scene) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let (w, h) = (renderer.ctx.config.width, renderer.ctx.config.height);
                        renderer.resize(w, h);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                    Err(e) => log::error!("render error: {e:?}"),
                }
                renderer.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() {
    env_logger::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            eprintln!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };

    let mut app = App::new();
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {e}");
    }
}
