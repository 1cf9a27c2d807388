//! Importer: expone un artifact externo como output propio.
//!
//! No crea datos: publica una referencia al artifact registrado por el
//! executor para el input `source`.

use pipe_core::{Component, ComponentOutputs, ComponentRunResult, ExecutionContext};

use super::{finish, single_input};

#[derive(Debug, Default)]
pub struct Importer;

impl Component for Importer {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        let result = single_input(ctx, "source").map(|a| ComponentOutputs::new().existing("result", a.id));
        finish(ctx, result)
    }
}
