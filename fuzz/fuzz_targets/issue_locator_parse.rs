#![no_main]

use libfuzzer_sys::fuzz_target;
use tidier_github_issues::IssueLocatorPattern;

fuzz_target!(|data: &[u8]| {
    let locator = String::from_utf8_lossy(data);
    let Ok(pattern) = IssueLocatorPattern::for_api_base("https://api.github.com") else {
        return;
    };
    if let Ok(repo) = pattern.repo_ref(&locator) {
        assert!(!repo.owner.is_empty());
        assert!(!repo.name.is_empty());
        assert!(!repo.owner.contains('/'));
        assert!(!repo.name.contains('/'));
        assert!(locator.contains(&repo.full_name()));
    }
});
