use ravel_headless_app::headless_app::HeadlessApp;

fn main() -> anyhow::Result<()> {
    HeadlessApp::run("ravel.toml")
}
