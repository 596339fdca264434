//! Macros for ergonomic state table construction.

/// Build a [`StateTable`](crate::builder::StateTable) from `name => state`
/// pairs. Expands to a `Result<StateTable, BuildError>`.
///
/// # Example
///
/// ```
/// use machineapp::core::{AppState, StateContext};
/// use machineapp::state_table;
///
/// struct Idle;
///
/// impl AppState for Idle {
///     fn on_enter(&mut self, _ctx: &mut StateContext<'_>) -> anyhow::Result<()> {
///         Ok(())
///     }
/// }
///
/// let table = state_table! {
///     "Idle" => Idle,
/// }
/// .unwrap();
/// assert!(table.contains("Idle"));
/// ```
#[macro_export]
macro_rules! state_table {
    ($($name:expr => $state:expr),* $(,)?) => {
        $crate::builder::StateTableBuilder::new()
            $(.state($name, $state))*
            .build()
    };
}
