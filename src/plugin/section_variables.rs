//! Case transforms callable inline from other options, e.g.
//! `[&mString:ToUpper(some text)]`. Without arguments the measure's own
//! `Input` option is transformed.

use crate::host::MeasureHost;
use crate::plugin::Measure;

#[derive(Debug, Default)]
pub struct CaseMeasure {
    input: String,
}

impl Measure for CaseMeasure {
    fn reload(&mut self, host: &dyn MeasureHost) {
        self.input = host.read_string("Input", "");
    }

    fn update(&mut self, _host: &dyn MeasureHost) -> f64 {
        0.0
    }

    fn string_value(&self, _host: &dyn MeasureHost) -> Option<String> {
        Some(self.input.clone())
    }

    fn section_call(&mut self, function: &str, args: &[String]) -> Option<String> {
        let source = args.first().unwrap_or(&self.input);
        if function.eq_ignore_ascii_case("ToUpper") {
            Some(source.to_ascii_uppercase())
        } else if function.eq_ignore_ascii_case("ToLower") {
            Some(source.to_ascii_lowercase())
        } else {
            None
        }
    }
}
