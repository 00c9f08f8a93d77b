use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

/// Receives "n units completed" events while a long external operation runs.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, units_completed: u64);

    fn set_total(&mut self, _total: u64) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(u64) + Send,
{
    fn on_progress(&mut self, units_completed: u64) {
        self(units_completed)
    }
}

/// Progress bar attached to a tracing span, drawn by the indicatif layer.
pub struct SpanProgress {
    span: Span,
}

impl SpanProgress {
    pub fn new(span: Span) -> Self {
        let style =
            ProgressStyle::with_template("{span_child_prefix}{span_name} {wide_bar} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
        span.pb_set_style(&style);
        Self { span }
    }
}

impl ProgressSink for SpanProgress {
    fn on_progress(&mut self, units_completed: u64) {
        self.span.pb_inc(units_completed);
    }

    fn set_total(&mut self, total: u64) {
        self.span.pb_set_length(total);
    }
}

#[cfg(test)]
mod tests {
    use super::ProgressSink;

    fn drive(sink: &mut dyn ProgressSink) {
        sink.set_total(4);
        sink.on_progress(2);
        sink.on_progress(1);
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        drive(&mut |units: u64| seen.push(units));
        assert_eq!(seen, vec![2, 1]);
    }
}
