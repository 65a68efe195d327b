use crate::config::{BridgeOptions, RenderMode};
use crate::error::BridgeError;
use crate::host::Host;
use crate::input::{KeyEvent, PointerSample};
use crate::scheduler::{FrameAction, FrameScheduler, SchedulerState};
use crate::seed::derive_seed;
use crate::simulation::Simulation;
use crate::surface::Surface;
use log::{debug, error, info, warn};
use rand::rngs::OsRng;
use std::cell::RefCell;
use std::future::Future;
use std::rc::{Rc, Weak};

/// State shared between the controller and the host callbacks it registers.
struct Shared<H: Host, S> {
    host: Rc<H>,
    surface: Option<Surface<H>>,
    simulation: Option<S>,
    scheduler: FrameScheduler,
}

impl<H, S> Shared<H, S>
where
    H: Host + 'static,
    S: Simulation<H::Canvas> + 'static,
{
    fn on_frame(&mut self) -> bool {
        match self.scheduler.on_frame() {
            FrameAction::Halt => false,
            FrameAction::Skip => true,
            FrameAction::Step => {
                self.step();
                true
            }
        }
    }

    fn step(&mut self) {
        let (Some(surface), Some(simulation)) = (self.surface.as_mut(), self.simulation.as_mut()) else {
            return;
        };

        simulation.tick();

        if let Err(e) = surface.draw(&self.host, simulation) {
            error!("Failed to draw frame {}: {}", self.scheduler.frame(), e);
        }
    }

    fn pointer_moved(&mut self, client_x: f64, client_y: f64) {
        let (Some(surface), Some(simulation)) = (self.surface.as_ref(), self.simulation.as_mut()) else {
            return;
        };

        let bounds = self.host.bounding_box(surface.element());

        if let Some(sample) = PointerSample::normalize(client_x, client_y, &bounds) {
            simulation.move_mouse(sample.x, sample.y);
        }
    }

    fn key_pressed(&mut self, event: KeyEvent) {
        if let Some(simulation) = self.simulation.as_mut() {
            simulation.press_key(event.code);
        }
    }

    /// Hands the loaded simulation over and enters the frame loop.
    fn attach(shared: &Rc<RefCell<Self>>, mut simulation: S) -> bool {
        let host = {
            let mut state = shared.borrow_mut();

            if !state.scheduler.start() {
                warn!("Simulation arrived after the bridge left idle; releasing it");
                simulation.free();
                return false;
            }

            state.simulation = Some(simulation);
            Rc::clone(&state.host)
        };

        schedule_frame(&host, Rc::downgrade(shared));
        true
    }
}

fn schedule_frame<H, S>(host: &Rc<H>, shared: Weak<RefCell<Shared<H, S>>>)
where
    H: Host + 'static,
    S: Simulation<H::Canvas> + 'static,
{
    let next_host = Rc::clone(host);

    let requested = host.request_animation_frame(Box::new(move || {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let keep_going = match shared.try_borrow_mut() {
            Ok(mut state) => state.on_frame(),
            Err(_) => true,
        };

        if keep_going {
            schedule_frame(&next_host, Rc::downgrade(&shared));
        }
    }));

    if let Err(e) = requested {
        error!("Failed to request animation frame: {}", e);
    }
}

/// Binds one simulation to one surface and the host's input events.
///
/// Dropping a bridge tears it down exactly like [`Bridge::dispose`].
pub struct Bridge<H: Host, S: Simulation<H::Canvas>> {
    shared: Rc<RefCell<Shared<H, S>>>,
    host: Rc<H>,
    listeners: Vec<H::Listener>,
    mode: RenderMode,
    seed: u32,
}

impl<H, S> Bridge<H, S>
where
    H: Host + 'static,
    S: Simulation<H::Canvas> + 'static,
{
    /// Resolves the container, builds the surface and starts listening for
    /// input. The simulation is supplied later through [`Bridge::run`] or
    /// [`Bridge::attach`].
    pub fn create(host: Rc<H>, options: &BridgeOptions) -> Result<Self, BridgeError> {
        let mode = options.render_mode()?;
        let container_id = options.container_id();
        let container = host
            .container(container_id)
            .ok_or_else(|| BridgeError::ContainerNotFound(container_id.unwrap_or("body").to_string()))?;

        let seed = derive_seed(options.seed.as_deref(), &mut OsRng);
        info!("Creating {} bridge with seed {}", mode, seed);

        let surface = Surface::create(host.as_ref(), mode, &container, &options.layout)?;

        let shared = Rc::new(RefCell::new(Shared {
            host: Rc::clone(&host),
            surface: Some(surface),
            simulation: None,
            scheduler: FrameScheduler::default(),
        }));

        let mut bridge = Self {
            shared,
            host,
            listeners: Vec::with_capacity(2),
            mode,
            seed,
        };

        if let Err(e) = bridge.listen() {
            bridge.dispose();
            return Err(e);
        }

        Ok(bridge)
    }

    fn listen(&mut self) -> Result<(), BridgeError> {
        let shared = Rc::downgrade(&self.shared);
        let pointer = self.host.add_pointer_listener(Box::new(move |x, y| {
            if let Some(shared) = shared.upgrade() {
                if let Ok(mut state) = shared.try_borrow_mut() {
                    state.pointer_moved(x, y);
                }
            }
        }))?;
        self.listeners.push(pointer);

        let shared = Rc::downgrade(&self.shared);
        let key = self.host.add_key_listener(Box::new(move |code| {
            if let Some(shared) = shared.upgrade() {
                if let Ok(mut state) = shared.try_borrow_mut() {
                    state.key_pressed(KeyEvent::new(code));
                }
            }
        }))?;
        self.listeners.push(key);

        Ok(())
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Numeric seed the simulation should be constructed with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.borrow().scheduler.state()
    }

    pub fn frame(&self) -> u64 {
        self.shared.borrow().scheduler.frame()
    }

    pub fn surface_element(&self) -> Option<H::Element> {
        self.shared
            .borrow()
            .surface
            .as_ref()
            .map(|surface| surface.element().clone())
    }

    /// Installs an already constructed simulation and starts the frame loop.
    pub fn attach(&self, simulation: S) -> bool {
        Shared::attach(&self.shared, simulation)
    }

    /// Loads the simulation asynchronously, then starts the frame loop.
    ///
    /// The returned future only holds a weak reference to the bridge; if the
    /// bridge is disposed before loading completes, the simulation is freed
    /// and never attached. A failed load leaves the bridge idle for good.
    pub fn run<F, Fut>(&self, load: F) -> impl Future<Output = Result<(), BridgeError>> + 'static
    where
        F: FnOnce(u32) -> Fut,
        Fut: Future<Output = Result<S, BridgeError>> + 'static,
    {
        let shared = Rc::downgrade(&self.shared);
        let pending = load(self.seed);

        async move {
            let mut simulation = pending.await.map_err(|e| {
                error!("{}", e);
                e
            })?;

            match shared.upgrade() {
                Some(shared) => {
                    if Shared::attach(&shared, simulation) {
                        info!("Simulation loaded");
                    }
                }
                None => {
                    debug!("Bridge disposed while loading; releasing simulation");
                    simulation.free();
                }
            }

            Ok(())
        }
    }

    /// Detaches listeners, stops the loop, removes the surface and releases
    /// the simulation.
    pub fn dispose(mut self) {
        self.teardown();
    }
}

impl<H: Host, S: Simulation<H::Canvas>> Bridge<H, S> {
    fn teardown(&mut self) {
        for listener in self.listeners.drain(..) {
            self.host.remove_listener(listener);
        }

        let (surface, simulation) = match self.shared.try_borrow_mut() {
            Ok(mut state) => {
                if state.scheduler.state() == SchedulerState::Stopped {
                    return;
                }

                state.scheduler.stop();
                (state.surface.take(), state.simulation.take())
            }
            Err(_) => {
                warn!("Bridge torn down from inside one of its own callbacks; surface left in place");
                return;
            }
        };

        if let Some(surface) = surface {
            surface.remove(&self.host);
        }

        if let Some(mut simulation) = simulation {
            simulation.free();
        }

        info!("Bridge disposed");
    }
}

impl<H: Host, S: Simulation<H::Canvas>> Drop for Bridge<H, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
