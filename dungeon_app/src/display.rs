//! Headless display replaying a fixed keyboard script

use std::time::Duration;

use dungeon_engine::input::{keys, raise_key};
use dungeon_engine::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// One raw key callback, as a platform window layer would deliver it
#[derive(Debug, Clone, Copy)]
pub struct ScriptedKey {
    pub frame: u32,
    pub key: i32,
    pub action: i32,
}

impl ScriptedKey {
    pub const fn press(frame: u32, key: i32) -> Self {
        Self { frame, key, action: 1 }
    }

    pub const fn release(frame: u32, key: i32) -> Self {
        Self { frame, key, action: 0 }
    }
}

/// Walk from the title into the test scene and back, twice
pub fn demo_script() -> Vec<ScriptedKey> {
    vec![
        ScriptedKey::press(30, keys::ENTER),
        ScriptedKey::release(32, keys::ENTER),
        ScriptedKey::press(90, keys::ESCAPE),
        ScriptedKey::release(92, keys::ESCAPE),
        ScriptedKey::press(130, keys::SPACE),
        ScriptedKey::release(131, keys::SPACE),
        ScriptedKey::press(200, keys::ESCAPE),
        ScriptedKey::release(203, keys::ESCAPE),
    ]
}

/// Display without a window
///
/// Each frame sleeps for a jittered frame time, so the fixed-timestep loop
/// sees uneven frame lengths the way it would under a real compositor.
pub struct ScriptedDisplay {
    script: Vec<ScriptedKey>,
    frame: u32,
    frame_budget: u32,
    frame_time: f32,
    rng: StdRng,
}

impl ScriptedDisplay {
    pub fn new(script: Vec<ScriptedKey>, frame_budget: u32, frame_time: f32, seed: u64) -> Self {
        Self {
            script,
            frame: 0,
            frame_budget,
            frame_time,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub const fn frames(&self) -> u32 {
        self.frame
    }
}

impl Display for ScriptedDisplay {
    fn should_close(&self) -> bool {
        self.frame >= self.frame_budget
    }

    fn poll_events(&mut self, sender: &EventSender) {
        for entry in self.script.iter().filter(|entry| entry.frame == self.frame) {
            raise_key(sender, entry.key, 0, entry.action, 0);
        }
    }

    fn render(&mut self, scene: Option<&ManagedScene>, alpha: f32) {
        if let Some(scene) = scene {
            scene.draw(alpha);
        }
        self.frame += 1;

        if self.frame_time > 0.0 {
            let jitter = self.rng.gen_range(0.5..1.5);
            std::thread::sleep(Duration::from_secs_f32(self.frame_time * jitter));
        }
    }

    fn destroy(&mut self) {
        log::info!("Display closed after {} frames", self.frame);
    }
}
