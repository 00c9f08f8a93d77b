use indicatif::ProgressStyle;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::{
    filter::Directive, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::process::TOOL_OUTPUT_TARGET;

const CRATES: [&str; 4] = ["sfmrun", "sfmrun_core", "sfmrun_colmap", "sfmrun_openmvg"];

pub fn enable_tracing(debug: bool, tool_output: bool) {
    let indicatif_layer =
        IndicatifLayer::new().with_max_progress_bars(16, Some(ProgressStyle::default_bar()));
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .with(tracing_filter(filter, debug, tool_output))
        .init();
}

fn tracing_filter(mut filter: EnvFilter, debug: bool, tool_output: bool) -> EnvFilter {
    if debug {
        for name in CRATES {
            if let Ok(directive) = format!("{}=debug", name).parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }
    }

    // Only the per-line tool output is capped, the rest of the module follows `debug`
    let level = if tool_output { "debug" } else { "info" };
    if let Ok(directive) = format!("{}={}", TOOL_OUTPUT_TARGET, level).parse::<Directive>() {
        filter = filter.add_directive(directive);
    }
    filter
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tracing::{debug, Event, Subscriber};
    use tracing_subscriber::{
        layer::{Context, SubscriberExt},
        EnvFilter, Layer,
    };

    use super::tracing_filter;

    #[derive(Clone, Default)]
    struct Targets(Arc<Mutex<Vec<String>>>);

    impl<S: Subscriber> Layer<S> for Targets {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            self.0
                .lock()
                .unwrap()
                .push(event.metadata().target().to_owned());
        }
    }

    #[test]
    fn debug_keeps_exit_codes_without_tool_output() {
        let targets = Targets::default();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_filter(EnvFilter::new("info"), true, false))
            .with(targets.clone());

        tracing::subscriber::with_default(subscriber, || {
            debug!(target: "sfmrun_core::process", code = 0, "finished");
            debug!(target: "sfmrun_core::process::output", stream = "stderr", "tool line");
        });

        assert_eq!(*targets.0.lock().unwrap(), vec!["sfmrun_core::process"]);
    }
}
