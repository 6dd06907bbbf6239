use std::cell::RefCell;
use std::f64::consts::PI;
use std::rc::{Rc, Weak};

use log::{debug, warn};

use super::schedule::{FrameId, FrameScheduler};
use super::types::{GraphData, Point};
use crate::config::LayoutConfig;

/// Ticks the alpha schedule takes to cool from 1 to `alpha_min`.
const COOLING_TICKS: f64 = 300.0;
const INITIAL_RADIUS: f64 = 10.0;
const MIN_DISTANCE_SQ: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Particle {
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
}

#[derive(Clone, Debug)]
struct Spring {
	source: usize,
	target: usize,
	strength: f64,
	/// Share of the correction applied to the target; the source takes the rest.
	bias: f64,
}

/// Link, many-body and centering forces resolved against node indices.
#[derive(Clone, Debug)]
pub struct Forces {
	springs: Vec<Spring>,
	link_distance: f64,
	charge: f64,
	center: Point,
	velocity_decay: f64,
}

impl Forces {
	pub fn new(data: &GraphData, center: Point, config: &LayoutConfig) -> Self {
		let mut degree = vec![0usize; data.nodes.len()];
		let mut ends = Vec::with_capacity(data.links.len());
		for link in &data.links {
			match (data.index_of(&link.source), data.index_of(&link.target)) {
				(Some(src), Some(tgt)) => {
					degree[src] += 1;
					degree[tgt] += 1;
					ends.push((src, tgt, link.weight));
				}
				_ => warn!("dropping link {} -> {}: unknown endpoint", link.source, link.target),
			}
		}

		let springs = ends
			.into_iter()
			.map(|(source, target, weight)| Spring {
				source,
				target,
				strength: weight.max(config.min_link_strength),
				bias: degree[source] as f64 / (degree[source] + degree[target]) as f64,
			})
			.collect();

		Self {
			springs,
			link_distance: config.link_distance,
			charge: config.charge_strength,
			center,
			velocity_decay: config.velocity_decay,
		}
	}

	fn apply_links(&self, p: &mut [Particle], alpha: f64) {
		for (i, spring) in self.springs.iter().enumerate() {
			let (s, t) = (p[spring.source], p[spring.target]);
			let mut x = t.x + t.vx - s.x - s.vx;
			let mut y = t.y + t.vy - s.y - s.vy;
			if x == 0.0 {
				x = jiggle(i);
			}
			if y == 0.0 {
				y = jiggle(i + 1);
			}
			let len = (x * x + y * y).sqrt();
			let k = (len - self.link_distance) / len * alpha * spring.strength;
			let (x, y) = (x * k, y * k);

			p[spring.target].vx -= x * spring.bias;
			p[spring.target].vy -= y * spring.bias;
			p[spring.source].vx += x * (1.0 - spring.bias);
			p[spring.source].vy += y * (1.0 - spring.bias);
		}
	}

	fn apply_charge(&self, p: &mut [Particle], alpha: f64) {
		for i in 0..p.len() {
			for j in 0..p.len() {
				if i == j {
					continue;
				}
				let mut x = p[j].x - p[i].x;
				let mut y = p[j].y - p[i].y;
				let mut dist_sq = x * x + y * y;
				if x == 0.0 {
					x = jiggle(i * 31 + j);
					dist_sq += x * x;
				}
				if y == 0.0 {
					y = jiggle(j * 31 + i);
					dist_sq += y * y;
				}
				if dist_sq < MIN_DISTANCE_SQ {
					dist_sq = (MIN_DISTANCE_SQ * dist_sq).sqrt();
				}
				let w = self.charge * alpha / dist_sq;
				p[i].vx += x * w;
				p[i].vy += y * w;
			}
		}
	}

	fn apply_center(&self, p: &mut [Particle]) {
		if p.is_empty() {
			return;
		}
		let n = p.len() as f64;
		let sx = p.iter().map(|q| q.x).sum::<f64>() / n - self.center.x;
		let sy = p.iter().map(|q| q.y).sum::<f64>() / n - self.center.y;
		for q in p.iter_mut() {
			q.x -= sx;
			q.y -= sy;
		}
	}
}

/// Tiny deterministic offset used to separate coincident points.
fn jiggle(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	((x as f64) / 233280.0 - 0.5) * 1e-6
}

/// One simulation step at cooling level `alpha`. The input is left untouched.
pub fn advance(particles: &[Particle], forces: &Forces, alpha: f64) -> Vec<Particle> {
	let mut next = particles.to_vec();
	forces.apply_links(&mut next, alpha);
	forces.apply_charge(&mut next, alpha);
	forces.apply_center(&mut next);
	let keep = 1.0 - forces.velocity_decay;
	for p in &mut next {
		p.vx *= keep;
		p.vy *= keep;
		p.x += p.vx;
		p.y += p.vy;
	}
	next
}

/// Force simulation over one graph, cooling from alpha 1 towards `alpha_min`.
pub struct Simulation {
	particles: Vec<Particle>,
	forces: Forces,
	alpha: f64,
	alpha_min: f64,
	alpha_decay: f64,
}

impl Simulation {
	pub fn new(data: &GraphData, width: f64, height: f64, config: &LayoutConfig) -> Self {
		let center = Point {
			x: width / 2.0,
			y: height / 2.0,
		};
		// Phyllotaxis spiral keeps initial points distinct and roughly round.
		let golden = PI * (3.0 - 5f64.sqrt());
		let particles = (0..data.nodes.len())
			.map(|i| {
				let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
				let angle = i as f64 * golden;
				Particle {
					x: center.x + radius * angle.cos(),
					y: center.y + radius * angle.sin(),
					..Particle::default()
				}
			})
			.collect();

		Self {
			particles,
			forces: Forces::new(data, center, config),
			alpha: 1.0,
			alpha_min: config.alpha_min,
			alpha_decay: 1.0 - config.alpha_min.powf(1.0 / COOLING_TICKS),
		}
	}

	pub fn tick(&mut self) {
		self.alpha -= self.alpha * self.alpha_decay;
		self.particles = advance(&self.particles, &self.forces, self.alpha);
	}

	pub fn converged(&self) -> bool {
		self.alpha < self.alpha_min
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn positions(&self) -> Vec<Point> {
		self.particles
			.iter()
			.map(|p| Point { x: p.x, y: p.y })
			.collect()
	}
}

/// Receives a position snapshot, in node order, after every tick.
pub type TickListener = Box<dyn FnMut(&[Point])>;

struct EngineState {
	sim: Simulation,
	pending: Option<FrameId>,
	running: bool,
	ticks: usize,
	listener: Rc<RefCell<TickListener>>,
}

/// Drives a [`Simulation`] one tick per frame until it settles or is stopped.
pub struct LayoutEngine {
	state: Rc<RefCell<EngineState>>,
	frames: Rc<dyn FrameScheduler>,
}

impl LayoutEngine {
	pub fn new(sim: Simulation, frames: Rc<dyn FrameScheduler>, listener: TickListener) -> Self {
		Self {
			state: Rc::new(RefCell::new(EngineState {
				sim,
				pending: None,
				running: false,
				ticks: 0,
				listener: Rc::new(RefCell::new(listener)),
			})),
			frames,
		}
	}

	pub fn start(&self) {
		{
			let mut state = self.state.borrow_mut();
			if state.running || state.sim.converged() {
				return;
			}
			state.running = true;
		}
		schedule(&self.state, &self.frames);
	}

	/// Halts ticking and cancels the pending frame, if any.
	pub fn stop(&self) {
		let pending = {
			let mut state = self.state.borrow_mut();
			state.running = false;
			state.pending.take()
		};
		if let Some(id) = pending {
			self.frames.cancel_frame(id);
		}
	}

	pub fn is_running(&self) -> bool {
		self.state.borrow().running
	}

	pub fn ticks(&self) -> usize {
		self.state.borrow().ticks
	}

	pub fn positions(&self) -> Vec<Point> {
		self.state.borrow().sim.positions()
	}
}

impl Drop for LayoutEngine {
	fn drop(&mut self) {
		self.stop();
	}
}

fn schedule(state: &Rc<RefCell<EngineState>>, frames: &Rc<dyn FrameScheduler>) {
	let (weak_state, weak_frames): (Weak<RefCell<EngineState>>, Weak<dyn FrameScheduler>) =
		(Rc::downgrade(state), Rc::downgrade(frames));
	let id = frames.request_frame(Box::new(move || {
		if let (Some(state), Some(frames)) = (weak_state.upgrade(), weak_frames.upgrade()) {
			on_frame(&state, &frames);
		}
	}));
	state.borrow_mut().pending = Some(id);
}

fn on_frame(state: &Rc<RefCell<EngineState>>, frames: &Rc<dyn FrameScheduler>) {
	let (snapshot, listener, again) = {
		let mut s = state.borrow_mut();
		s.pending = None;
		if !s.running {
			return;
		}
		s.sim.tick();
		s.ticks += 1;
		let again = !s.sim.converged();
		if !again {
			s.running = false;
			debug!("layout settled after {} ticks", s.ticks);
		}
		(s.sim.positions(), s.listener.clone(), again)
	};

	(listener.borrow_mut())(&snapshot);

	if again && state.borrow().running {
		schedule(state, frames);
	}
}
