/// Tuning knobs of a [`Reconciler`](`crate::Reconciler`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// How deeply renderables (including component output) may nest before a render fails with [`Error::DepthLimit`](`crate::Error::DepthLimit`).
	pub depth_limit: usize,
	/// A warning is logged after each render that leaves at least this many native event listeners installed.
	pub listener_warning_threshold: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			depth_limit: 512,
			listener_warning_threshold: 1000,
		}
	}
}

impl Config {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn depth_limit(mut self, depth_limit: usize) -> Self {
		self.depth_limit = depth_limit;
		self
	}

	#[must_use]
	pub fn listener_warning_threshold(mut self, listener_warning_threshold: usize) -> Self {
		self.listener_warning_threshold = listener_warning_threshold;
		self
	}
}
