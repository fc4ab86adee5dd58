use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// GITHUB_WORKSPACE と RUNNER_TEMP を一時ディレクトリにしたテスト環境
pub struct TestWorkspace {
    pub workspace: TempDir,
    pub runner_temp: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            workspace: tempfile::tempdir().unwrap(),
            runner_temp: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write_images_json(&self, content: &str) {
        let dir = self.workspace.path().join("docker");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("images.json"), content).unwrap();
    }

    /// 作業ディレクトリ（RUNNER_TEMP/docker_images_check）
    pub fn temp_path(&self) -> PathBuf {
        self.runner_temp.path().join("docker_images_check")
    }

    pub fn read_temp_file(&self, name: &str) -> String {
        fs::read_to_string(self.temp_path().join(name)).unwrap()
    }

    #[allow(dead_code)]
    pub fn read_report(&self, prefix: &str) -> serde_json::Value {
        let path = self
            .temp_path()
            .join("artifacts")
            .join(prefix)
            .join("report.json");
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    pub fn command(&self) -> assert_cmd::Command {
        #[allow(deprecated)]
        let mut cmd = assert_cmd::Command::cargo_bin("docker-images-check").unwrap();
        cmd.env("GITHUB_WORKSPACE", self.workspace.path())
            .env("RUNNER_TEMP", self.runner_temp.path())
            .env_remove("PR_NUMBER")
            .env_remove("GITHUB_SHA")
            .env_remove("GITHUB_BASE_REF")
            .env_remove("IMAGECHECK_DOCKER")
            .env("RUST_LOG", "info");
        cmd
    }
}
