use thiserror::Error;

/// Everything that can abort a render.
///
/// None of these are retried. A render that fails may already have applied some DOM mutations,
/// so the [`Reconciler`](`crate::Reconciler`) that produced the error is poisoned afterwards
/// and refuses to render again until it is [`unmount`](`crate::Reconciler::unmount`)ed.
#[derive(Debug, Error)]
pub enum Error {
	/// The DOM refused to create an element with this tag name.
	#[error("could not create <{tag}>: {reason}")]
	ElementCreation { tag: String, reason: String },

	/// A prop that is deliberately not supported was set.
	#[error("`{0}` is not supported")]
	UnsupportedProp(&'static str),

	/// A node that should be removed has no parent.
	///
	/// This points to an inconsistency between the fiber tree and the DOM, usually because
	/// something other than the reconciler moved or removed managed nodes.
	#[error("can't remove {node}: it is not attached to a parent node")]
	Detached { node: String },

	/// The renderable tree is nested deeper than [`Config::depth_limit`](`crate::Config::depth_limit`).
	#[error("depth limit of {0} reached")]
	DepthLimit(usize),

	/// Any other failed DOM operation.
	#[error("DOM operation `{operation}` failed: {reason}")]
	Dom { operation: &'static str, reason: String },

	/// An earlier render failed part-way through.
	#[error("the reconciler is poisoned by an earlier failed render")]
	Poisoned,
}

impl Error {
	pub(crate) fn dom(operation: &'static str, reason: impl Into<String>) -> Self {
		Self::Dom { operation, reason: reason.into() }
	}
}
