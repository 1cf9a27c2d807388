#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pipe_core::{typed_artifact, ArtifactSpec, Component, ComponentOutputs, ComponentRunResult, ComponentSpec,
                ExecutionContext, PipelineBuilder, PipelineDefinition};
use serde_json::json;

typed_artifact!(Numbers { values: Vec<i64> } type_name: "Numbers");
typed_artifact!(Total { sum: i64 } type_name: "Total");

/// Contador de invocaciones compartido entre componentes de prueba.
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct Source {
    pub calls: Calls,
    pub delay_ms: u64,
}

impl Component for Source {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        self.calls.hit();
        if self.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(self.delay_ms));
        }
        let n = ctx.config_value("n").and_then(|v| v.as_i64()).unwrap_or(3);
        ComponentOutputs::new().typed("numbers",
                                      Numbers { values: (1..=n).collect(),
                                                schema_version: 1 })
                               .map_err(|e| e.to_string())
                               .into()
    }
}

#[derive(Debug, Default)]
pub struct Sum {
    pub calls: Calls,
}

impl Component for Sum {
    fn run(&self, ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        self.calls.hit();
        let run = || -> Result<ComponentOutputs, String> {
            let mut sum = 0;
            for a in ctx.input("numbers") {
                sum += Numbers::from_artifact(a).map_err(|e| e.to_string())?.values.iter().sum::<i64>();
            }
            ComponentOutputs::new().typed("total", Total { sum, schema_version: 1 })
                                   .map_err(|e| e.to_string())
        };
        run().into()
    }
}

#[derive(Debug, Default)]
pub struct Failing;

impl Component for Failing {
    fn run(&self, _ctx: &ExecutionContext<'_>) -> ComponentRunResult {
        ComponentRunResult::failure("boom")
    }
}

/// source -> sum
pub fn sum_pipeline(n: i64, source: Source, sum: Sum) -> PipelineDefinition {
    PipelineBuilder::new("sum").component(ComponentSpec::new("source").output("numbers", "Numbers")
                                                                     .config(json!({ "n": n })),
                                          source)
                               .component(ComponentSpec::new("sum").input("numbers", "Numbers", "source", "numbers")
                                                                  .output("total", "Total"),
                                          sum)
                               .build()
                               .unwrap()
}
