//! Demo scenes: a spinning title menu and a test scene that exercises cascades

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use dungeon_engine::prelude::*;

/// Degrees per second the title emblem turns
const SPIN_RATE: f32 = 50.0;

/// Counter that re-raises itself one higher on every delivery
#[derive(Debug)]
pub struct CounterEvent {
    header: EventHeader,
    value: u32,
}

impl CounterEvent {
    pub fn new(value: u32) -> Self {
        Self {
            header: EventHeader::new(),
            value,
        }
    }

    pub const fn value(&self) -> u32 {
        self.value
    }
}

impl Kind for CounterEvent {
    const NAME: &'static str = "counter";
}

impl Event for CounterEvent {
    fn header(&self) -> &EventHeader {
        &self.header
    }

    fn kinds(&self) -> Vec<EventKind> {
        vec![EventKind::of::<Self>()]
    }

    fn view(&self, kind: EventKind) -> Option<&dyn Any> {
        (kind == EventKind::of::<Self>()).then_some(self as &dyn Any)
    }
}

/// Title menu; any key press opens the test scene
#[derive(Default)]
pub struct TitleMenuScene {
    angle: f32,
    previous_angle: f32,
    start: Rc<Cell<bool>>,
}

impl TitleMenuScene {
    pub fn new() -> Self {
        Self::default()
    }

    fn spin(&mut self, delta: f32) {
        self.previous_angle = self.angle;
        self.angle += SPIN_RATE * delta;
        if self.angle >= 360.0 {
            self.angle -= 360.0;
            self.previous_angle -= 360.0;
        }
    }

    /// Emblem angle interpolated between the last two updates
    pub fn angle_at(&self, alpha: f32) -> f32 {
        self.previous_angle + (self.angle - self.previous_angle) * alpha
    }
}

impl Scene for TitleMenuScene {
    fn name(&self) -> &str {
        "title_menu"
    }

    fn on_init(&mut self, ctx: &mut SceneContext<'_>) {
        let start = Rc::clone(&self.start);
        if let Err(e) = ctx.subscribe::<KeyPressEvent, _>(move |_, _| start.set(true)) {
            log::error!("Title menu could not listen for keys: {e}");
        }
        log::info!("Title menu ready, press any key");
    }

    fn on_resume(&mut self, _ctx: &mut SceneContext<'_>) {
        // Presses heard while covered belong to the scene that was on top
        self.start.set(false);
        log::info!("Back at the title menu");
    }

    fn on_update(&mut self, _ctx: &mut SceneContext<'_>, delta: f32) -> Transition {
        self.spin(delta);
        if self.start.replace(false) {
            Transition::Push(Box::new(TestScene::new()))
        } else {
            Transition::None
        }
    }

    fn draw(&self, alpha: f32) {
        log::trace!("Title emblem at {:.1} degrees", self.angle_at(alpha));
    }
}

/// Test scene; releasing escape returns to the title
#[derive(Default)]
pub struct TestScene {
    quit: Rc<Cell<bool>>,
    counted: Rc<Cell<u32>>,
    updates: u32,
}

impl TestScene {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scene for TestScene {
    fn name(&self) -> &str {
        "test"
    }

    fn on_init(&mut self, ctx: &mut SceneContext<'_>) {
        let quit = Rc::clone(&self.quit);
        let released = ctx.subscribe::<KeyReleaseEvent, _>(move |_, release| {
            if release.as_key().key() == keys::ESCAPE {
                quit.set(true);
            }
        });

        let counted = Rc::clone(&self.counted);
        let counting = ctx.subscribe::<CounterEvent, _>(move |bus, counter| {
            counted.set(counted.get() + 1);
            log::debug!("Counter at {}", counter.value());
            bus.raise(CounterEvent::new(counter.value() + 1));
        });

        if let Err(e) = released.and(counting) {
            log::error!("Test scene could not subscribe: {e}");
        }
        ctx.raise(CounterEvent::new(0));
        log::info!("Entered test scene, release escape to leave");
    }

    fn on_update(&mut self, _ctx: &mut SceneContext<'_>, _delta: f32) -> Transition {
        self.updates += 1;
        if self.quit.get() {
            Transition::Pop
        } else {
            Transition::None
        }
    }

    fn on_cleanup(&mut self, _ctx: &mut SceneContext<'_>) {
        log::info!(
            "Leaving test scene after {} updates and {} counter events",
            self.updates,
            self.counted.get()
        );
    }
}
