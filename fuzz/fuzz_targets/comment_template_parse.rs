#![no_main]

use libfuzzer_sys::fuzz_target;
use tidier_core::CommentTemplate;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    if let Ok(template) = CommentTemplate::parse(&raw) {
        let rendered = template.render("waiting on response", 90);
        if !raw.contains('{') && !raw.contains('}') {
            assert_eq!(rendered, raw);
        }
    }
});
