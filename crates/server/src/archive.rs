use std::io::{Cursor, Write};
use std::path::PathBuf;

use tracing::{debug, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Entity, RequestError, ValidationError};

/// Packs the files of a task directory into a zip for download.
#[derive(Clone, Debug)]
pub struct ArchiveBuilder {
    tasks_dir: PathBuf,
}

impl ArchiveBuilder {
    pub fn new(tasks_dir: PathBuf) -> Self {
        Self { tasks_dir }
    }

    #[instrument(skip(self))]
    pub async fn build_archive(&self, task_name: &str) -> Result<Vec<u8>, RequestError> {
        validate_task_name(task_name)?;
        let task_dir = self.tasks_dir.join(task_name);
        let is_dir = tokio::fs::metadata(&task_dir)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(RequestError::not_found(Entity::Task, task_name));
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&task_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let content = tokio::fs::read(entry.path()).await?;
            files.push((name, content));
        }
        files.sort_by(|(a, _), (b, _)| a.cmp(b));
        debug!("packing {} files of task `{task_name}`", files.len());

        tokio::task::spawn_blocking(move || pack(files))
            .await
            .map_err(std::io::Error::other)?
    }
}

fn pack(files: Vec<(String, Vec<u8>)>) -> Result<Vec<u8>, RequestError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in files {
        writer.start_file(name, options)?;
        writer.write_all(&content)?;
    }
    Ok(writer.finish()?.into_inner())
}

fn validate_task_name(task_name: &str) -> Result<(), ValidationError> {
    let forbidden = task_name.is_empty()
        || task_name == "."
        || task_name.contains("..")
        || task_name.contains(['/', '\\']);
    if forbidden {
        return Err(ValidationError::InvalidInput {
            value: task_name.to_string(),
            reason: "task name must be a single path segment".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[tokio::test]
    async fn archive_contains_every_task_file() {
        let dir = tempfile::tempdir().unwrap();
        let task_dir = dir.path().join("git-clone");
        std::fs::create_dir_all(task_dir.join("tests")).unwrap();
        std::fs::write(task_dir.join("git-clone.yaml"), "kind: Task\n").unwrap();
        std::fs::write(task_dir.join("README.md"), "# git-clone\n").unwrap();

        let builder = ArchiveBuilder::new(dir.path().to_path_buf());
        let bytes = builder.build_archive("git-clone").await.unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["README.md", "git-clone.yaml"]);

        let mut content = String::new();
        archive
            .by_name("git-clone.yaml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "kind: Task\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn entries_are_packed_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let task_dir = dir.path().join("buildah");
        std::fs::create_dir_all(&task_dir).unwrap();
        for name in ["samples.yaml", "buildah.yaml", "README.md"] {
            std::fs::write(task_dir.join(name), name).unwrap();
        }

        let builder = ArchiveBuilder::new(dir.path().to_path_buf());
        let bytes = builder.build_archive("buildah").await.unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["README.md", "buildah.yaml", "samples.yaml"]);
    }

    #[tokio::test]
    async fn traversal_and_missing_tasks_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let builder = ArchiveBuilder::new(dir.path().to_path_buf());

        for name in ["../etc", "a/b", "..", ""] {
            let err = builder.build_archive(name).await.unwrap_err();
            assert!(matches!(err, RequestError::Validation(_)), "{name}");
        }
        let err = builder.build_archive("buildah").await.unwrap_err();
        assert!(matches!(
            err,
            RequestError::NotFound {
                entity: Entity::Task,
                ..
            }
        ));
    }
}
