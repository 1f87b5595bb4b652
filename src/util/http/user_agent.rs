use rand::RngExt;

const CHROME_VERSIONS: &[&str] = &[
    "141.0.7390.108",
    "140.0.7339.208",
    "139.0.7258.155",
    "138.0.7204.184",
    "137.0.7151.120",
];

const FIREFOX_VERSIONS: &[&str] = &["144.0", "143.0", "142.0", "141.0", "140.0"];

const PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "X11; Linux x86_64",
];

/// 隨機產生桌面瀏覽器的 User-Agent
pub fn gen_random_ua() -> String {
    let mut rng = rand::rng();
    let platform = PLATFORMS[rng.random_range(0..PLATFORMS.len())];

    if rng.random_range(0..10) < 7 {
        let version = CHROME_VERSIONS[rng.random_range(0..CHROME_VERSIONS.len())];
        format!(
            "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
            platform, version
        )
    } else {
        let version = FIREFOX_VERSIONS[rng.random_range(0..FIREFOX_VERSIONS.len())];
        format!(
            "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
            platform, version, version
        )
    }
}
