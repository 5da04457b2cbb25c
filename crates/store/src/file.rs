//! 백킹 로그를 가진 내구성 스토어
//!
//! 한 줄에 레코드 하나씩 JSON으로 기록하는 추가 전용 파일(JSON Lines)을 유지합니다.
//!
//! # 순서
//! 1. 레코드를 직렬화하여 백킹 로그에 추가하고 `sync_all`로 안정 저장소에 기록
//! 2. 성공한 경우에만 내부 [`InMemoryStore`]에 반영
//!
//! 두 단계는 서로 다른 락으로 직렬화되며 하나의 트랜잭션으로 묶이지 않습니다.
//! 1과 2 사이에서 프로세스가 죽으면 다음 시작 시 재생으로 복구됩니다.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use logrelay_core::types::{CounterSnapshot, Record};

use crate::LogStore;
use crate::error::StoreError;
use crate::memory::InMemoryStore;
use crate::query::QueryFilter;

/// 파일 백킹 스토어
#[derive(Debug)]
pub struct FileBackedStore {
    path: PathBuf,
    log: Mutex<File>,
    mem: InMemoryStore,
}

impl FileBackedStore {
    /// 백킹 로그를 열고 기존 내용을 재생합니다.
    ///
    /// 파일이 없으면 빈 스토어로 시작합니다. 상위 디렉토리가 없으면 생성합니다.
    /// 재생 중 디코딩에 실패하면 생성 자체가 실패합니다.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mem = InMemoryStore::new();
        let replayed = match replay(&path, &mem).await {
            Ok(count) => count,
            Err(e) => {
                error!(path = %path.display(), error = %e, "backing log replay failed");
                return Err(e);
            }
        };

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        info!(path = %path.display(), replayed, "file-backed store opened");

        Ok(Self {
            path,
            log: Mutex::new(log),
            mem,
        })
    }

    /// 백킹 로그 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 백킹 로그를 한 줄씩 읽어 메모리 스토어에 적용합니다.
async fn replay(path: &Path, mem: &InMemoryStore) -> Result<usize, StoreError> {
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no backing log yet, starting empty");
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    let mut count = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let record: Record = serde_json::from_str(&line).map_err(|e| StoreError::Replay {
            line: line_no,
            reason: e.to_string(),
        })?;
        mem.append(record).await;
        count += 1;
    }
    Ok(count)
}

impl LogStore for FileBackedStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn ingest(&self, record: Record) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        {
            let mut log = self.log.lock().await;
            log.write_all(&line).await?;
            log.flush().await?;
            log.sync_all().await?;
        }

        self.mem.append(record).await;
        Ok(())
    }

    async fn query(&self, filter: &QueryFilter) -> Vec<Record> {
        self.mem.query(filter).await
    }

    async fn metrics(&self) -> CounterSnapshot {
        self.mem.metrics().await
    }

    async fn len(&self) -> usize {
        self.mem.len().await
    }
}
