#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = covnorm::formatters::simplecov::parse(data);
    let _ = covnorm::formatters::excoveralls::parse(data);
    let _ = covnorm::formatters::lcovjson::parse(data);
    let _ = covnorm::formatters::xccov::parse(data);
    let _ = covnorm::output::load(data);
});
