//! Name-to-guard lookup.

// self
use crate::{_prelude::*, auth::GuardName, guard::Guard};

/// Guards addressable by name.
#[derive(Clone, Default)]
pub struct GuardRegistry {
	guards: HashMap<GuardName, Arc<dyn Guard>>,
}
impl GuardRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `guard` under its own name.
	pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
		self.register(guard);

		self
	}

	/// Adds `guard` under its own name, returning the guard it replaced.
	pub fn register(&mut self, guard: Arc<dyn Guard>) -> Option<Arc<dyn Guard>> {
		self.guards.insert(guard.name().clone(), guard)
	}

	/// Looks a guard up by name.
	pub fn get(&self, name: &str) -> Option<Arc<dyn Guard>> {
		self.guards.get(name).cloned()
	}

	/// Registered guard names in sorted order.
	pub fn names(&self) -> Vec<&GuardName> {
		let mut names = self.guards.keys().collect::<Vec<_>>();

		names.sort();

		names
	}
}
impl Debug for GuardRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GuardRegistry").field("guards", &self.names()).finish()
	}
}
