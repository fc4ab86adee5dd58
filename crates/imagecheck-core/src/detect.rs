//! 変更ファイルから直接影響を受けるイメージを検出

use crate::catalog::ImageCatalog;
use crate::model::ImageNode;
use tracing::info;

/// 変更されたファイルのいずれかがディレクトリ配下にあるカタログエントリを返す
///
/// カタログの記述順に走査し、エントリごとに最初にマッチしたファイルで打ち切ります。
/// 同じディレクトリ配下の複数ファイルが変更されていてもノードは1つだけです。
pub fn detect_changed_images<S: AsRef<str>>(
    catalog: &ImageCatalog,
    changed_files: &[S],
) -> Vec<ImageNode> {
    let mut changed = Vec::new();

    for (dockerfile_dir, entry) in catalog.iter() {
        let matched = changed_files
            .iter()
            .map(S::as_ref)
            .find(|file| file.starts_with(dockerfile_dir));

        if let Some(file) = matched {
            info!(
                "Found changed file '{}' which affects docker image '{}' with path '{}'",
                file, entry.name, dockerfile_dir
            );
            changed.push(ImageNode::new(dockerfile_dir, &entry.name));
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;

    fn catalog() -> ImageCatalog {
        ImageCatalog::from_entries([
            (
                "docker/test/base".to_string(),
                CatalogEntry {
                    name: "org/test-base".to_string(),
                    dependent: vec!["docker/test/stateless".to_string()],
                },
            ),
            (
                "docker/test/stateless".to_string(),
                CatalogEntry {
                    name: "org/stateless-test".to_string(),
                    dependent: vec![],
                },
            ),
            (
                "docker/packager/binary".to_string(),
                CatalogEntry {
                    name: "org/binary-builder".to_string(),
                    dependent: vec![],
                },
            ),
        ])
    }

    #[test]
    fn test_detect_single_entry_for_many_files() {
        let changed = [
            "docker/test/base/Dockerfile",
            "docker/test/base/run.sh",
            "src/Core/Settings.h",
        ];

        let images = detect_changed_images(&catalog(), &changed);

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path, "docker/test/base");
        assert_eq!(images[0].repo, "org/test-base");
        assert!(images[0].parent.is_none());
    }

    #[test]
    fn test_detect_follows_catalog_order() {
        let changed = ["docker/packager/binary/build.sh", "docker/test/stateless/run.sh"];

        let images = detect_changed_images(&catalog(), &changed);
        let paths: Vec<&str> = images.iter().map(|i| i.path.as_str()).collect();

        assert_eq!(paths, vec!["docker/test/stateless", "docker/packager/binary"]);
    }

    #[test]
    fn test_detect_plain_prefix_match() {
        // 文字列のプレフィックスで判定する（ディレクトリ境界は見ない）
        let changed = ["docker/test/base-extra/Dockerfile"];

        let images = detect_changed_images(&catalog(), &changed);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].path, "docker/test/base");
    }

    #[test]
    fn test_detect_nothing_changed() {
        let changed = ["README.md"];
        assert!(detect_changed_images(&catalog(), &changed).is_empty());

        let empty = ImageCatalog::default();
        assert!(detect_changed_images(&empty, &changed).is_empty());
    }

    #[test]
    fn test_detect_explicit_image_paths() {
        // --image-path で渡されたディレクトリ自体もプレフィックスとして一致する
        let changed = vec!["docker/packager/binary".to_string()];

        let images = detect_changed_images(&catalog(), &changed);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].repo, "org/binary-builder");
    }
}
