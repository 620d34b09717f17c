// Pond module - shared simulation context and the top-level mode state
// machine driving the fill -> play -> drain cycle.
use std::collections::HashMap;
use std::f64::consts::TAU;

use anyhow::Result;
use log::{debug, info};
use rand::Rng;

use crate::assets::AssetManager;
use crate::canvas::Canvas;
use crate::config::Config;
use crate::mobs::{spawn_droplet, DropletFlavor, Mob, Scene, SpawnContext, Spawners};
use crate::mud::Mud;
use crate::strip::LedStrip;
use crate::switches::{SwitchAction, Switches};

/// Life-cycle state. Each variant owns the timers relevant to its own
/// transitions so nothing leaks across a transition.
pub enum Mode {
    Filling {
        started: f64,
    },
    Playing {
        last_input: f64,
        last_mud_step: f64,
    },
    Draining {
        /// Entities were told to scram on entry; the level holds until the
        /// slowest of them has had time to clear the visible area.
        clear_until: f64,
        start_level: f64,
    },
}

pub struct Pond {
    pub config: Config,
    pub width: i32,
    pub height: i32,
    pub canvas: Canvas,
    pub strip: LedStrip,
    pub mud: Mud,
    pub mobs: Vec<Mob>,
    pub mode: Mode,
    pub level: f64,
    pub level_px: i32,
    pub health: f64,
    spawners: Spawners,
    counter: HashMap<&'static str, usize>,
}

impl Pond {
    pub fn new(config: Config, assets: &mut AssetManager, t: f64) -> Result<Self> {
        let width = config.matrix.width as i32;
        let height = config.matrix.height as i32;
        let canvas = Canvas::new(config.matrix.width, config.matrix.height);
        let strip = LedStrip::new(&config.strip.sections);
        let mud = Mud::new(
            config.matrix.width,
            config.matrix.height,
            config.gooddroplet.color,
            config.mud.decay,
        );
        let spawners = Spawners::new(&config, assets)?;
        let mut pond = Pond {
            config,
            width,
            height,
            canvas,
            strip,
            mud,
            mobs: Vec::new(),
            mode: Mode::Filling { started: t },
            level: 0.0,
            level_px: height,
            health: 1.0,
            spawners,
            counter: HashMap::new(),
        };
        pond.set_level(0.0);
        info!("pond starting: filling");
        Ok(pond)
    }

    fn set_level(&mut self, level: f64) {
        self.level = level;
        self.level_px = (level * -(self.height as f64) + self.height as f64) as i32;
    }

    /// Stable z-ordered insert: before the first mob whose z exceeds the
    /// newcomer's, preserving relative order among equal z.
    pub fn add_mob(&mut self, mob: Mob) {
        *self.counter.entry(mob.name()).or_insert(0) += 1;
        let at = self
            .mobs
            .iter()
            .position(|m| m.z > mob.z)
            .unwrap_or(self.mobs.len());
        self.mobs.insert(at, mob);
    }

    fn count(&self, name: &str) -> usize {
        self.counter.get(name).copied().unwrap_or(0)
    }

    fn droplets_active(&self) -> bool {
        self.count("gooddroplet") + self.count("baddroplet") > 0
    }

    /// One frame of simulation: switch actions, mode logic, background,
    /// sediment, wave, then every live mob.
    pub fn tick(
        &mut self,
        t: f64,
        actions: &[SwitchAction],
        switches: &mut Switches,
        rng: &mut impl Rng,
    ) {
        self.handle_actions(t, actions, switches);
        self.advance_mode(t, switches, rng);
        self.draw_bg();
        self.mud.render(&mut self.canvas);
        self.draw_wave(t);
        self.update_mobs(t, rng);
    }

    fn handle_actions(&mut self, t: f64, actions: &[SwitchAction], switches: &mut Switches) {
        for &action in actions {
            // bindings only exist while playing, but guard anyway: a stale
            // press must not disturb filling or draining
            let Mode::Playing { last_input, .. } = &mut self.mode else {
                continue;
            };
            *last_input = t;
            match action {
                SwitchAction::InjectGood => {
                    let length = self.config.strip_section_length("gooddroplet");
                    let mob = spawn_droplet(DropletFlavor::Good, &self.config, length, t);
                    self.add_mob(mob);
                }
                SwitchAction::InjectBad => {
                    let length = self.config.strip_section_length("baddroplet");
                    let mob = spawn_droplet(DropletFlavor::Bad, &self.config, length, t);
                    self.add_mob(mob);
                }
                SwitchAction::Reset => {
                    info!("manual reset requested");
                    self.enter_draining(t, switches);
                }
            }
        }
    }

    fn advance_mode(&mut self, t: f64, switches: &mut Switches, rng: &mut impl Rng) {
        match self.mode {
            Mode::Filling { started } => {
                let target = self.config.pond.initial_level;
                let progress = ((t - started) / self.config.pond.fill_duration).clamp(0.0, 1.0);
                self.set_level(progress * target);
                if self.level >= target {
                    self.enter_playing(t, switches);
                }
            }
            Mode::Playing { last_input, last_mud_step } => {
                self.adjust_level(rng);
                self.spawn_mobs(t, rng);
                if t - last_mud_step >= self.config.mud.update_rate {
                    self.mud.step(rng);
                    let delta = self.mud.value() as f64 / self.config.pond.healthsteps;
                    self.health = (self.health + delta).clamp(0.0, 1.0);
                    if let Mode::Playing { last_mud_step, .. } = &mut self.mode {
                        *last_mud_step = t;
                    }
                }
                if let Some(timeout) = self.config.pond.auto_reset {
                    if t > last_input + timeout {
                        info!("auto reset after {timeout}s without input");
                        self.enter_draining(t, switches);
                    }
                }
            }
            Mode::Draining { clear_until, start_level } => {
                if t >= clear_until {
                    let duration = start_level * self.config.pond.drain_duration;
                    let level = if duration > 0.0 {
                        start_level * (1.0 - (t - clear_until) / duration)
                    } else {
                        0.0
                    };
                    self.set_level(level.max(0.0));
                    if self.level <= 0.0 {
                        self.enter_filling(t);
                    }
                }
            }
        }
    }

    fn enter_playing(&mut self, t: f64, switches: &mut Switches) {
        info!("pond full: playing");
        self.health = 1.0;
        self.mud = Mud::new(
            self.config.matrix.width,
            self.config.matrix.height,
            self.config.gooddroplet.color,
            self.config.mud.decay,
        );
        switches.clear_bindings();
        switches.bind(0, SwitchAction::InjectGood);
        switches.bind(1, SwitchAction::InjectBad);
        switches.bind(2, SwitchAction::Reset);
        self.mode = Mode::Playing {
            last_input: t,
            last_mud_step: t,
        };
    }

    fn enter_draining(&mut self, t: f64, switches: &mut Switches) {
        switches.clear_bindings();
        let width = self.width;
        let mut clear_time: f64 = 0.0;
        for mob in &mut self.mobs {
            clear_time = clear_time.max(mob.scram(width, t));
        }
        debug!("active mobs at drain: {:?}", self.counter);
        info!("draining in {clear_time:.1}s");
        self.mode = Mode::Draining {
            clear_until: t + clear_time,
            start_level: self.level,
        };
    }

    fn enter_filling(&mut self, t: f64) {
        info!("pond empty: filling");
        for mob in self.mobs.drain(..) {
            debug!("cycle reset removed {}", mob.name());
        }
        self.counter.clear();
        self.mode = Mode::Filling { started: t };
    }

    /// Small bounded random walk of the water level while playing.
    fn adjust_level(&mut self, rng: &mut impl Rng) {
        let draw = rng.gen::<f64>();
        if draw < 0.001 {
            let sign = if draw >= 0.0005 { 1.0 } else { -1.0 };
            let level = (self.level + sign / self.height as f64)
                .clamp(self.config.pond.level_min, self.config.pond.level_max);
            self.set_level(level);
        }
    }

    fn spawn_mobs(&mut self, t: f64, rng: &mut impl Rng) {
        let ctx = SpawnContext {
            health: self.health,
            level_px: self.level_px,
            width: self.width,
            height: self.height,
            droplets_active: self.droplets_active(),
        };
        let spawned = self.spawners.run(&ctx, &self.config, t, rng);
        for mob in spawned {
            self.add_mob(mob);
        }
    }

    fn draw_bg(&mut self) {
        let sky = self.config.pond.sky_color;
        let water = self.config.pond.water_color;
        self.canvas
            .fill_rect(0, 0, self.width - 1, self.level_px - 1, sky);
        self.canvas
            .fill_rect(0, self.level_px, self.width - 1, self.height - 1, water);
    }

    /// Traveling shimmer on the "wave" strip section, scaled by the level.
    fn draw_wave(&mut self, t: f64) {
        let Some(length) = self.strip.section_length("wave") else {
            return;
        };
        let water = self.config.pond.water_color;
        for i in 0..length as i32 {
            let phase = i as f64 / 12.0 * TAU - t * 2.0;
            let brightness = (0.55 + 0.45 * phase.sin()) * self.level;
            self.strip
                .set_pixel("wave", i, water.brighten(40).darken(brightness));
        }
    }

    fn update_mobs(&mut self, t: f64, rng: &mut impl Rng) {
        let mut mobs = std::mem::take(&mut self.mobs);
        {
            let mut scene = Scene {
                canvas: &mut self.canvas,
                strip: &mut self.strip,
                mud: &mut self.mud,
                width: self.width,
                height: self.height,
                level_px: self.level_px,
                water_color: self.config.pond.water_color,
                sky_color: self.config.pond.sky_color,
            };
            let counter = &mut self.counter;
            mobs.retain_mut(|mob| {
                let alive = mob.update(&mut scene, t, rng);
                if !alive {
                    if let Some(count) = counter.get_mut(mob.name()) {
                        *count = count.saturating_sub(1);
                    }
                }
                alive
            });
        }
        self.mobs = mobs;
    }
}
