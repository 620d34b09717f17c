// Mobs module - the kinematic entity model, the creature catalogue, and the
// probabilistic spawners. Creatures are one record with a kind tag; behavior
// is dispatched over the tag instead of an inheritance chain.
use std::rc::Rc;

use anyhow::Result;
use log::debug;
use rand::Rng;

use crate::assets::{AssetManager, Sprite};
use crate::canvas::Canvas;
use crate::config::{Config, DropletConfig};
use crate::mud::Mud;
use crate::strip::LedStrip;
use crate::types::{Rgb, BLACK};

/// Pixel coordinates truncate toward zero, for positive and negative
/// products alike. Every position computation funnels through here.
fn trunc_coord(v: f64) -> i32 {
    v as i32
}

/// Position as a function of time: linear extrapolation from an origin
/// fixed when the velocity last changed.
#[derive(Clone, Copy, Debug)]
pub struct Trajectory {
    start: (i32, i32),
    start_time: f64,
    velocity: (f64, f64),
}

impl Trajectory {
    pub fn new(start: (i32, i32), t: f64, velocity: (f64, f64)) -> Self {
        Trajectory {
            start,
            start_time: t,
            velocity,
        }
    }

    pub fn position(&self, t: f64) -> (i32, i32) {
        let dt = t - self.start_time;
        (
            trunc_coord(self.start.0 as f64 + self.velocity.0 * dt),
            trunc_coord(self.start.1 as f64 + self.velocity.1 * dt),
        )
    }

    pub fn velocity(&self) -> (f64, f64) {
        self.velocity
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Install a new velocity, freezing the origin at the current position so
    /// motion stays continuous. Calling with the current velocity is a no-op
    /// (it must not reset the origin time).
    pub fn change(&mut self, t: f64, velocity: (f64, f64)) {
        if velocity == self.velocity {
            return;
        }
        self.start = self.position(t);
        self.start_time = t;
        self.velocity = velocity;
    }
}

/// One entry of a fading trail: where the entity was, and when.
pub type TrailEntry = ((i32, i32), f64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropletFlavor {
    Good,
    Bad,
}

pub struct Fish {
    pub sprite: Rc<Sprite>,
}

pub struct Rain {
    pub section: String,
    pub color: Rgb,
    pub length: i32,
    pub waterspeed: (f64, f64),
    pub fade_time: f64,
    pub trail_fade_time: f64,
    pub trail: Vec<TrailEntry>,
    pub entered_water: Option<f64>,
}

pub struct Droplet {
    pub flavor: DropletFlavor,
    pub section: String,
    pub color: Rgb,
    pub length: i32,
    pub waterspeed: (f64, f64),
    pub trail_fade_time: f64,
    pub trail: Vec<TrailEntry>,
    pub entered_mud: Option<f64>,
}

pub enum MobKind {
    Fish(Fish),
    Rain(Rain),
    Droplet(Droplet),
    Bubble,
}

pub struct Mob {
    pub kind: MobKind,
    pub traj: Trajectory,
    pub z: i32,
    /// Cache of the last computed position; the trajectory is ground truth.
    pub position: (i32, i32),
}

/// Everything a mob may touch during one update. Borrowed from the pond for
/// the duration of the update pass.
pub struct Scene<'a> {
    pub canvas: &'a mut Canvas,
    pub strip: &'a mut LedStrip,
    pub mud: &'a mut Mud,
    pub width: i32,
    pub height: i32,
    pub level_px: i32,
    pub water_color: Rgb,
    pub sky_color: Rgb,
}

impl Mob {
    pub fn name(&self) -> &'static str {
        match &self.kind {
            MobKind::Fish(_) => "fish",
            MobKind::Rain(_) => "rain",
            MobKind::Droplet(d) => match d.flavor {
                DropletFlavor::Good => "gooddroplet",
                DropletFlavor::Bad => "baddroplet",
            },
            MobKind::Bubble => "bubbles",
        }
    }

    /// Advance one frame. Returns false once the mob is done; the caller
    /// removes it from the active list (a mob never removes itself).
    pub fn update(&mut self, scene: &mut Scene, t: f64, rng: &mut impl Rng) -> bool {
        let previous = self.position;
        let position = self.traj.position(t);
        self.position = position;
        match self.kind {
            MobKind::Fish(_) => update_fish(self, scene),
            MobKind::Rain(_) => update_rain(self, scene, previous, t),
            MobKind::Droplet(_) => update_droplet(self, scene, previous, t, rng),
            MobKind::Bubble => update_bubble(self, scene),
        }
    }

    /// Prepare to leave the visible area quickly; returns how long that will
    /// take. Mobs that fade or fall out on their own report zero.
    pub fn scram(&mut self, scene_width: i32, t: f64) -> f64 {
        match &self.kind {
            MobKind::Fish(fish) => {
                let (sx, sy) = self.traj.velocity();
                let direction = if sx < 0.0 { -1.0 } else { 1.0 };
                self.traj.change(t, (direction * 20.0, sy));
                let (x, _) = self.traj.position(t);
                let exit_x = if direction < 0.0 {
                    -(fish.sprite.width as i32)
                } else {
                    scene_width
                };
                (exit_x - x) as f64 / (direction * 20.0)
            }
            _ => 0.0,
        }
    }
}

fn update_fish(mob: &mut Mob, scene: &mut Scene) -> bool {
    let MobKind::Fish(fish) = &mob.kind else {
        return false;
    };
    let (x, y) = mob.position;
    let (sx, _) = mob.traj.velocity();
    if sx > 0.0 && x >= scene.width {
        debug!("despawning fish");
        return false;
    }
    if sx < 0.0 && x < -(fish.sprite.width as i32) {
        debug!("despawning fish");
        return false;
    }
    scene.canvas.paste(&fish.sprite, x, y);
    true
}

/// Droplet tail on the strip: `length` pixels darkening toward the back,
/// with one black pixel behind to erase the previous frame. Indices that
/// fall off the section are dropped by the addressing layer.
fn draw_on_strip(strip: &mut LedStrip, section: &str, y: i32, length: i32, color: Rgb) {
    for i in 0..length {
        let dim = (length - i) as f64 / length as f64;
        strip.set_pixel(section, y - i, color.darken(dim));
    }
    strip.set_pixel(section, y - length, BLACK);
}

/// Draw a fading trail, dropping fully faded entries as they are found.
/// Entries below the water line blend toward the water color, entries above
/// it toward the sky color.
fn draw_trail(
    trail: &mut Vec<TrailEntry>,
    canvas: &mut Canvas,
    color: Rgb,
    fade_time: f64,
    level_px: i32,
    water_color: Rgb,
    sky_color: Rgb,
    t: f64,
) {
    trail.retain(|&((tx, ty), tt)| {
        let factor = (t - tt) / fade_time;
        if factor >= 1.0 {
            return false;
        }
        let bg = if ty < level_px { sky_color } else { water_color };
        canvas.put_pixel(tx, ty, color.blend(bg, factor));
        true
    });
}

fn push_trail(trail: &mut Vec<TrailEntry>, position: (i32, i32), t: f64) {
    if trail.last().map(|&(p, _)| p) != Some(position) {
        trail.push((position, t));
    }
}

fn update_rain(mob: &mut Mob, scene: &mut Scene, previous: (i32, i32), t: f64) -> bool {
    let (x, y) = mob.position;
    let MobKind::Rain(rain) = &mut mob.kind else {
        return false;
    };

    if y >= scene.level_px && rain.entered_water.is_none() {
        rain.entered_water = Some(t);
        mob.traj.change(t, rain.waterspeed);
    }

    // the strip only needs a write when the position changed
    if (x, y) != previous && y < rain.length {
        draw_on_strip(scene.strip, &rain.section, y, rain.length, rain.color);
    }

    let mut still_drawing = false;
    if y >= 0 && y < scene.height {
        draw_trail(
            &mut rain.trail,
            scene.canvas,
            rain.color,
            rain.trail_fade_time,
            scene.level_px,
            scene.water_color,
            scene.water_color, // rain trails fade toward the water color everywhere
            t,
        );
        still_drawing = !rain.trail.is_empty();

        let factor = match rain.entered_water {
            Some(entered) => (t - entered) / rain.fade_time,
            None => 0.0,
        };
        if factor < 1.0 {
            still_drawing = true;
            let color = rain.color.blend(scene.water_color, factor);
            scene.canvas.put_pixel(x, y, color);
            push_trail(&mut rain.trail, (x, y), t);
        }
    }

    if y >= scene.height || (y >= 0 && !still_drawing) {
        debug!("despawning rain");
        return false;
    }
    true
}

fn update_droplet(
    mob: &mut Mob,
    scene: &mut Scene,
    previous: (i32, i32),
    t: f64,
    rng: &mut impl Rng,
) -> bool {
    let (x, y) = mob.position;
    let MobKind::Droplet(droplet) = &mut mob.kind else {
        return false;
    };

    // once the droplet has touched the bed its trajectory stays frozen
    if y >= scene.level_px && droplet.entered_mud.is_none() {
        mob.traj.change(t, droplet.waterspeed);
    }

    if (x, y) != previous && y < droplet.length {
        draw_on_strip(scene.strip, &droplet.section, y, droplet.length, droplet.color);
    }

    if y >= 0 && y < scene.height {
        draw_trail(
            &mut droplet.trail,
            scene.canvas,
            droplet.color,
            droplet.trail_fade_time,
            scene.level_px,
            scene.water_color,
            scene.sky_color,
            t,
        );
        scene.canvas.put_pixel(x, y, droplet.color);
        push_trail(&mut droplet.trail, (x, y), t);
    }

    let surface = scene.mud.surface_px(x);
    if y + 1 >= surface || y + 1 >= scene.height {
        match droplet.entered_mud {
            None => {
                // deposit the particle once, then linger while the trail fades
                droplet.entered_mud = Some(t);
                scene.mud.add(x, droplet.color, rng);
                mob.traj.change(t, (0.0, 0.0));
            }
            Some(entered) => {
                if t > entered + droplet.trail_fade_time {
                    debug!("despawning {:?} droplet", droplet.flavor);
                    return false;
                }
            }
        }
    }
    true
}

fn update_bubble(mob: &mut Mob, scene: &mut Scene) -> bool {
    let (x, y) = mob.position;
    if y <= scene.level_px {
        return false;
    }
    scene
        .canvas
        .put_pixel(x, y, scene.water_color.brighten(20));
    true
}

// --- spawners ---------------------------------------------------------------

/// Read-only pond state the spawners gate on.
pub struct SpawnContext {
    pub health: f64,
    pub level_px: i32,
    pub width: i32,
    pub height: i32,
    pub droplets_active: bool,
}

struct FishSprites {
    left: Rc<Sprite>,
    right: Rc<Sprite>,
}

/// Spawner catalogue plus the cross-spawn state the original kept in
/// class-level statics (last rain time, last bubble position).
pub struct Spawners {
    fish_enabled: bool,
    rain_enabled: bool,
    bubbles_enabled: bool,
    fish_sprites: Vec<FishSprites>,
    last_rain: f64,
    last_bubble: Option<(f64, i32)>,
}

impl Spawners {
    pub fn new(config: &Config, assets: &mut AssetManager) -> Result<Self> {
        let mut fish_sprites = Vec::new();
        if config.pond.active_spawners.iter().any(|s| s == "fish") {
            for (i, (left, right)) in config.fish.sprites.iter().enumerate() {
                let pair = if assets.has_root() {
                    FishSprites {
                        left: assets.get(left)?,
                        right: assets.get(right)?,
                    }
                } else {
                    FishSprites {
                        left: assets.get_or_generate(&format!("builtin/fish{i}-left"), || {
                            generate_fish_sprite(i, false)
                        }),
                        right: assets.get_or_generate(&format!("builtin/fish{i}-right"), || {
                            generate_fish_sprite(i, true)
                        }),
                    }
                };
                fish_sprites.push(pair);
            }
        }
        let enabled = |name: &str| config.pond.active_spawners.iter().any(|s| s == name);
        Ok(Spawners {
            fish_enabled: enabled("fish"),
            rain_enabled: enabled("rain"),
            bubbles_enabled: enabled("bubbles"),
            fish_sprites,
            last_rain: 0.0,
            last_bubble: None,
        })
    }

    /// Run every active spawner's probabilistic gate once.
    pub fn run(
        &mut self,
        ctx: &SpawnContext,
        config: &Config,
        t: f64,
        rng: &mut impl Rng,
    ) -> Vec<Mob> {
        let mut spawned = Vec::new();
        if self.fish_enabled {
            if let Some(mob) = self.maybe_spawn_fish(ctx, config, t, rng) {
                spawned.push(mob);
            }
        }
        if self.rain_enabled {
            if let Some(mob) = self.maybe_spawn_rain(ctx, config, t) {
                spawned.push(mob);
            }
        }
        if self.bubbles_enabled {
            if let Some(mob) = self.maybe_spawn_bubble(ctx, config, t, rng) {
                spawned.push(mob);
            }
        }
        spawned
    }

    /// Fish appear more often in a healthier pond: the draw is scaled by a
    /// root of health, so the effective threshold decreases as health rises.
    fn maybe_spawn_fish(
        &mut self,
        ctx: &SpawnContext,
        config: &Config,
        t: f64,
        rng: &mut impl Rng,
    ) -> Option<Mob> {
        if self.fish_sprites.is_empty() || ctx.health <= 0.3 {
            return None;
        }
        let pair = &self.fish_sprites[rng.gen_range(0..self.fish_sprites.len())];
        let height = pair.left.height as i32;
        let ymin = ctx.level_px + height / 2;
        let ymax = ctx.height - height * 3 / 2;
        if ymin > ymax {
            return None; // water too shallow for this sprite
        }
        if rng.gen::<f64>() * ctx.health.powf(0.125) >= config.fish.spawn_threshold {
            return None;
        }
        let y = rng.gen_range(ymin..=ymax);
        let rightward = rng.gen::<bool>();
        let speed = rng.gen::<f64>() * 6.0 + 2.0;
        let (sprite, start_x, vx) = if rightward {
            (pair.right.clone(), -(pair.right.width as i32), speed)
        } else {
            (pair.left.clone(), ctx.width, -speed)
        };
        debug!("spawning fish at y={y}");
        Some(Mob {
            kind: MobKind::Fish(Fish { sprite }),
            traj: Trajectory::new((start_x, y), t, (vx, 0.0)),
            z: 0,
            position: (start_x, y),
        })
    }

    /// One raindrop per interval, and only while no droplet is in flight
    /// (they share the strip's vertical runs).
    fn maybe_spawn_rain(&mut self, ctx: &SpawnContext, config: &Config, t: f64) -> Option<Mob> {
        if t <= self.last_rain + config.rain.interval {
            return None;
        }
        // a blocking droplet still consumes the interval; the next drop
        // waits a full interval after this attempt
        self.last_rain = t;
        if ctx.droplets_active {
            return None;
        }
        debug!("spawning rain");
        let cfg = &config.rain;
        let start = (cfg.start_x, -(config.strip_section_length("rain") as i32));
        Some(Mob {
            kind: MobKind::Rain(Rain {
                section: "rain".into(),
                color: cfg.color,
                length: cfg.length,
                waterspeed: cfg.waterspeed,
                fade_time: cfg.fade_time,
                trail_fade_time: cfg.trail_fade_time,
                trail: Vec::new(),
                entered_water: None,
            }),
            traj: Trajectory::new(start, t, cfg.airspeed),
            z: -1,
            position: start,
        })
    }

    /// Bubbles cluster: a spawn within a second of the previous one surfaces
    /// next to it, otherwise a fresh random column is chosen.
    fn maybe_spawn_bubble(
        &mut self,
        ctx: &SpawnContext,
        config: &Config,
        t: f64,
        rng: &mut impl Rng,
    ) -> Option<Mob> {
        if ctx.health <= 0.3 {
            return None;
        }
        if rng.gen::<f64>() * ctx.health.powf(0.125) >= config.bubbles.spawn_threshold {
            return None;
        }
        let x = match self.last_bubble {
            Some((last_t, last_x)) if t - last_t < 1.0 => {
                (last_x + rng.gen_range(-1..=1)).clamp(0, ctx.width - 1)
            }
            _ => rng.gen_range(1..(ctx.width - 1).max(2)),
        };
        self.last_bubble = Some((t, x));
        let start = (x, ctx.height - 1);
        Some(Mob {
            kind: MobKind::Bubble,
            traj: Trajectory::new(start, t, (0.0, -5.0)),
            z: 0,
            position: start,
        })
    }
}

/// Operator-injected droplet, bound to a switch rather than a spawner gate.
pub fn spawn_droplet(
    flavor: DropletFlavor,
    config: &Config,
    section_length: usize,
    t: f64,
) -> Mob {
    let cfg: &DropletConfig = match flavor {
        DropletFlavor::Good => &config.gooddroplet,
        DropletFlavor::Bad => &config.baddroplet,
    };
    let section = match flavor {
        DropletFlavor::Good => "gooddroplet",
        DropletFlavor::Bad => "baddroplet",
    };
    let start = (cfg.start_x, -(section_length as i32));
    debug!("spawning {section}");
    Mob {
        kind: MobKind::Droplet(Droplet {
            flavor,
            section: section.into(),
            color: cfg.color,
            length: cfg.length,
            waterspeed: cfg.waterspeed,
            trail_fade_time: cfg.trail_fade_time,
            trail: Vec::new(),
            entered_mud: None,
        }),
        traj: Trajectory::new(start, t, cfg.airspeed),
        z: 0,
        position: start,
    }
}

/// Built-in fish sprite used when no asset directory is configured: a small
/// body with a tail notch, mirrored for direction, tinted per variant.
fn generate_fish_sprite(variant: usize, rightward: bool) -> Sprite {
    const W: usize = 8;
    const H: usize = 5;
    // rows of a right-facing fish; 1 = body, 0 = transparent
    const SHAPE: [[u8; 8]; 5] = [
        [0, 0, 1, 1, 1, 0, 0, 0],
        [1, 0, 1, 1, 1, 1, 1, 0],
        [1, 1, 1, 1, 1, 1, 1, 1],
        [1, 0, 1, 1, 1, 1, 1, 0],
        [0, 0, 1, 1, 1, 0, 0, 0],
    ];
    let color = if variant % 2 == 0 {
        Rgb::new(0xdd, 0x88, 0x22)
    } else {
        Rgb::new(0x22, 0xaa, 0x66)
    };
    let mut pixels = Vec::with_capacity(W * H);
    let mut mask = Vec::with_capacity(W * H);
    for row in &SHAPE {
        for x in 0..W {
            let sx = if rightward { x } else { W - 1 - x };
            pixels.push(color);
            mask.push(if row[sx] == 1 { 255 } else { 0 });
        }
    }
    Sprite {
        width: W,
        height: H,
        pixels,
        mask,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_position_truncates_toward_zero() {
        let traj = Trajectory::new((0, 0), 0.0, (10.0, 0.0));
        assert_eq!(traj.position(2.5), (25, 0));
        // negative product truncates toward zero, not floor
        let traj = Trajectory::new((0, 0), 0.0, (-10.0, 0.0));
        assert_eq!(traj.position(0.05), (0, 0));
        assert_eq!(traj.position(1.5), (-15, 0));
    }

    #[test]
    fn test_change_trajectory_is_continuous() {
        let mut traj = Trajectory::new((0, 0), 0.0, (10.0, 0.0));
        let before = traj.position(2.0);
        traj.change(2.0, (0.0, 4.0));
        assert_eq!(traj.position(2.0), before);
        // extrapolation after the change uses only the new trajectory
        assert_eq!(traj.position(3.0), (before.0, before.1 + 4));
    }

    #[test]
    fn test_change_with_equal_velocity_keeps_origin_time() {
        let mut traj = Trajectory::new((5, 5), 1.0, (2.0, 3.0));
        traj.change(7.0, (2.0, 3.0));
        assert_eq!(traj.start_time(), 1.0);
        traj.change(7.0, (2.0, 4.0));
        assert_eq!(traj.start_time(), 7.0);
    }

    #[test]
    fn test_trail_drops_faded_entries_lazily() {
        let mut canvas = Canvas::new(16, 16);
        let color = Rgb::new(0, 0, 255);
        let water = Rgb::new(0, 0, 0xaa);
        let sky = Rgb::new(0, 0, 0x33);
        let mut trail: Vec<TrailEntry> = vec![((1, 1), 0.0), ((2, 2), 1.0)];
        draw_trail(&mut trail, &mut canvas, color, 2.0, 8, water, sky, 2.5);
        // the entry from t=0.0 is fully faded at t=2.5 and gets dropped
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].0, (2, 2));
        // the younger entry was drawn blended toward the sky color (above water)
        assert!(canvas.get_pixel(2, 2).unwrap() != crate::types::BLACK);
        assert_eq!(canvas.get_pixel(1, 1), Some(crate::types::BLACK));
    }

    #[test]
    fn test_fish_despawns_off_the_far_edge() {
        let sprite = Rc::new(generate_fish_sprite(0, true));
        let mut mob = Mob {
            kind: MobKind::Fish(Fish {
                sprite: sprite.clone(),
            }),
            traj: Trajectory::new((0, 10), 0.0, (10.0, 0.0)),
            z: 0,
            position: (0, 10),
        };
        let mut canvas = Canvas::new(64, 32);
        let mut strip = LedStrip::new(&[]);
        let mut mud = Mud::new(64, 32, Rgb::new(0, 0, 0xcc), None);
        let mut scene = Scene {
            canvas: &mut canvas,
            strip: &mut strip,
            mud: &mut mud,
            width: 64,
            height: 32,
            level_px: 8,
            water_color: Rgb::new(0, 0, 0xaa),
            sky_color: Rgb::new(0, 0, 0x33),
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(mob.update(&mut scene, 1.0, &mut rng));
        // at t=7 the fish has crossed x=64 and reports termination
        assert!(!mob.update(&mut scene, 7.0, &mut rng));
    }

    #[test]
    fn test_scram_reports_time_to_clear() {
        let sprite = Rc::new(generate_fish_sprite(0, true));
        let mut mob = Mob {
            kind: MobKind::Fish(Fish { sprite }),
            traj: Trajectory::new((10, 10), 0.0, (4.0, 0.0)),
            z: 0,
            position: (10, 10),
        };
        let clear = mob.scram(64, 5.0);
        // escape velocity installed, origin frozen at the t=5 position
        assert_eq!(mob.traj.velocity(), (20.0, 0.0));
        let expected = (64.0 - 30.0) / 20.0;
        assert!((clear - expected).abs() < 1e-9);
    }

    #[test]
    fn test_droplet_deposits_once_and_fades_out() {
        let config = Config::default();
        let mut mob = spawn_droplet(DropletFlavor::Good, &config, 65, 0.0);
        // place it just above the bed floor, stationary fall
        mob.traj = Trajectory::new((30, 30), 0.0, (0.0, 12.0));
        mob.position = (30, 30);

        let mut canvas = Canvas::new(64, 32);
        let mut strip = LedStrip::new(&[]);
        let mut mud = Mud::new(64, 32, config.gooddroplet.color, None);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scene = Scene {
            canvas: &mut canvas,
            strip: &mut strip,
            mud: &mut mud,
            width: 64,
            height: 32,
            level_px: 8,
            water_color: config.pond.water_color,
            sky_color: config.pond.sky_color,
        };

        assert!(mob.update(&mut scene, 0.1, &mut rng));
        assert_eq!(scene.mud.occupied(), 1);
        // lingering frames do not deposit again
        assert!(mob.update(&mut scene, 0.5, &mut rng));
        assert_eq!(scene.mud.occupied(), 1);
        // and the mob reports termination after the fade window
        let fade = config.gooddroplet.trail_fade_time;
        assert!(!mob.update(&mut scene, 0.2 + fade, &mut rng));
    }

    #[test]
    fn test_droplet_stays_frozen_while_lingering() {
        let config = Config::default();
        let mut mob = spawn_droplet(DropletFlavor::Good, &config, 65, 0.0);
        mob.traj = Trajectory::new((30, 30), 0.0, (0.0, 12.0));
        mob.position = (30, 30);

        let mut canvas = Canvas::new(64, 32);
        let mut strip = LedStrip::new(&[]);
        let mut mud = Mud::new(64, 32, config.gooddroplet.color, None);
        let mut rng = StdRng::seed_from_u64(5);
        let mut scene = Scene {
            canvas: &mut canvas,
            strip: &mut strip,
            mud: &mut mud,
            width: 64,
            height: 32,
            level_px: 8,
            water_color: config.pond.water_color,
            sky_color: config.pond.sky_color,
        };

        // first contact deposits and freezes the trajectory
        assert!(mob.update(&mut scene, 0.1, &mut rng));
        assert_eq!(mob.traj.velocity(), (0.0, 0.0));
        let rest = mob.position;
        // linger frames are below the water line too; the freeze must hold
        assert!(mob.update(&mut scene, 0.2, &mut rng));
        assert_eq!(mob.traj.velocity(), (0.0, 0.0));
        assert!(mob.update(&mut scene, 1.0, &mut rng));
        assert_eq!(mob.traj.velocity(), (0.0, 0.0));
        assert_eq!(mob.position, rest);
    }

    fn spawn_ctx(level_px: i32, droplets_active: bool) -> SpawnContext {
        SpawnContext {
            health: 1.0,
            level_px,
            width: 64,
            height: 32,
            droplets_active,
        }
    }

    #[test]
    fn test_fish_spawn_band_is_inclusive() {
        let mut config = Config::default();
        // gate always passes; only the y band decides
        config.fish.spawn_threshold = 2.0;
        let mut assets = AssetManager::new(None);
        let mut spawners = Spawners::new(&config, &mut assets).unwrap();
        let mut rng = StdRng::seed_from_u64(8);

        // builtin sprites are 5 tall: band is [level_px + 2, 25]; at
        // level_px 23 exactly one row qualifies and it must be usable
        let mob = spawners
            .maybe_spawn_fish(&spawn_ctx(23, false), &config, 0.0, &mut rng)
            .unwrap();
        assert_eq!(mob.position.1, 25);
        // one row shallower and the band is empty
        assert!(spawners
            .maybe_spawn_fish(&spawn_ctx(24, false), &config, 0.0, &mut rng)
            .is_none());
    }

    #[test]
    fn test_blocked_rain_restarts_its_interval() {
        let config = Config::default(); // rain.interval = 10
        let mut assets = AssetManager::new(None);
        let mut spawners = Spawners::new(&config, &mut assets).unwrap();

        // a droplet in flight blocks the drop and still consumes the interval
        assert!(spawners
            .maybe_spawn_rain(&spawn_ctx(8, true), &config, 11.0)
            .is_none());
        assert!(spawners
            .maybe_spawn_rain(&spawn_ctx(8, false), &config, 12.0)
            .is_none());
        let mob = spawners
            .maybe_spawn_rain(&spawn_ctx(8, false), &config, 21.5)
            .unwrap();
        assert_eq!(mob.name(), "rain");
    }

    #[test]
    fn test_bubble_pops_at_the_water_line() {
        let mut mob = Mob {
            kind: MobKind::Bubble,
            traj: Trajectory::new((5, 31), 0.0, (0.0, -5.0)),
            z: 0,
            position: (5, 31),
        };
        let mut canvas = Canvas::new(64, 32);
        let mut strip = LedStrip::new(&[]);
        let mut mud = Mud::new(64, 32, Rgb::new(0, 0, 0xcc), None);
        let mut scene = Scene {
            canvas: &mut canvas,
            strip: &mut strip,
            mud: &mut mud,
            width: 64,
            height: 32,
            level_px: 8,
            water_color: Rgb::new(0, 0, 0xaa),
            sky_color: Rgb::new(0, 0, 0x33),
        };
        let mut rng = StdRng::seed_from_u64(2);
        assert!(mob.update(&mut scene, 1.0, &mut rng));
        // 23 rows of rise at 5 px/s puts it past the water line
        assert!(!mob.update(&mut scene, 5.0, &mut rng));
    }
}
