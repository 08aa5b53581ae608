use std::fs;

use pretty_assertions::assert_eq;
use starter_crawler::{load_proxies, parse_proxy_list, ProxyConfiguration, ProxyFiles};

#[test]
fn keeps_trimmed_http_lines_in_order() {
    let content = "  http://dc-1:8000 \n\n# comment\nsocks5://nope:1080\r\nhttps://dc-2:8000\r\n\t\n";
    assert_eq!(
        parse_proxy_list(content),
        vec!["http://dc-1:8000", "https://dc-2:8000"]
    );
}

#[test]
fn loads_both_tiers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("proxy-datacenter.txt"),
        "http://dc-1:8000\n  http://dc-2:8000  \n",
    )
    .unwrap();
    fs::write(dir.path().join("proxy-residential.txt"), "http://res-1:9000\n").unwrap();

    let proxies = load_proxies(&ProxyFiles::new(dir.path()));

    assert_eq!(proxies.datacenter, vec!["http://dc-1:8000", "http://dc-2:8000"]);
    assert_eq!(proxies.residential, vec!["http://res-1:9000"]);
    assert!(!proxies.is_empty());
}

#[test]
fn custom_file_names() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("dc.txt"), "http://dc-1:8000\n").unwrap();
    fs::write(dir.path().join("res.txt"), "").unwrap();

    let files = ProxyFiles {
        dir: dir.path().to_path_buf(),
        datacenter_file: "dc.txt".into(),
        residential_file: "res.txt".into(),
    };
    let proxies = load_proxies(&files);

    assert_eq!(proxies.datacenter, vec!["http://dc-1:8000"]);
    assert!(proxies.residential.is_empty());
}

#[test]
fn missing_dir_gives_empty_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let proxies = load_proxies(&ProxyFiles::new(dir.path().join("nowhere")));
    assert!(proxies.datacenter.is_empty());
    assert!(proxies.residential.is_empty());
    assert!(proxies.into_configuration().is_none());
}

#[test]
fn one_missing_file_empties_both_tiers() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("proxy-datacenter.txt"), "http://dc-1:8000\n").unwrap();

    let proxies = load_proxies(&ProxyFiles::new(dir.path()));

    assert!(proxies.is_empty());
}

#[test]
fn retries_escalate_tiers_and_rotate_inside_a_tier() {
    let conf = ProxyConfiguration::from_tiers(vec![
        vec!["http://dc-1".into(), "http://dc-2".into()],
        vec!["http://res-1".into()],
    ])
    .unwrap();

    assert_eq!(conf.tier_count(), 2);
    assert_eq!(conf.new_url(0), "http://dc-1");
    assert_eq!(conf.new_url(0), "http://dc-2");
    assert_eq!(conf.new_url(0), "http://dc-1");
    assert_eq!(conf.new_url(1), "http://res-1");
    assert_eq!(conf.new_url(5), "http://res-1");
}

#[test]
fn empty_tiers_are_dropped() {
    let conf = ProxyConfiguration::from_tiers(vec![vec![], vec!["http://res-1".into()]]).unwrap();
    assert_eq!(conf.tier_count(), 1);
    assert_eq!(conf.new_url(0), "http://res-1");

    assert!(ProxyConfiguration::from_tiers(vec![vec![], vec![]]).is_none());
}
