use std::time::Duration;

use hostview_shared::{Pid, Process, SystemInfo};
use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// CPU使用率計測のための待ち時間（最低値）
const CPU_SAMPLE_WAIT: Duration = Duration::from_millis(500);

/// 小数第2位で丸める
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_GB).round()
}

/// システム情報を収集（ホスト名・OS・CPU・RAM・ストレージ）
pub fn collect_system_info() -> SystemInfo {
    let sys = System::new_with_specifics(
        RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::nothing().with_ram()),
    );

    let os = [
        System::name(),
        System::kernel_version(),
        System::os_version(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    let processor = sys
        .cpus()
        .first()
        .map(|cpu| cpu.brand().trim().to_string())
        .filter(|brand| !brand.is_empty())
        .or_else(|| Some(System::cpu_arch()));

    // ルートファイルシステム（無ければ最初のディスク）
    let disks = Disks::new_with_refreshed_list();
    let root_disk = disks
        .list()
        .iter()
        .find(|disk| disk.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.list().first());
    let (storage_total, storage_free) = root_disk
        .map(|disk| (disk.total_space(), disk.available_space()))
        .unwrap_or((0, 0));

    SystemInfo {
        name: System::host_name(),
        os: (!os.is_empty()).then_some(os),
        processor,
        cores: sys.physical_core_count().map(|count| count as u32),
        threads: Some(sys.cpus().len() as u32),
        ram_gb: Some(bytes_to_gb(sys.total_memory())),
        used_ram_gb: Some(bytes_to_gb(sys.used_memory())),
        available_ram_gb: Some(bytes_to_gb(sys.available_memory())),
        storage_free_gb: Some(bytes_to_gb(storage_free)),
        storage_total_gb: Some(bytes_to_gb(storage_total)),
        storage_used_gb: Some(bytes_to_gb(storage_total.saturating_sub(storage_free))),
    }
}

/// 収集対象外のプロセス（pid 0 と Idle 系）
pub fn is_idle_process(pid: Pid, name: &str) -> bool {
    pid == 0 || name.to_lowercase().contains("idle")
}

/// 1プロセス分のレコードを作る。対象外なら None
///
/// `cpu_usage` はコア単位の値（全コアで 100% * コア数）なので論理CPU数で割る。
pub fn process_record(
    pid: Pid,
    ppid: Option<Pid>,
    name: &str,
    memory_bytes: u64,
    cpu_usage: f32,
    cpu_count: usize,
) -> Option<Process> {
    if is_idle_process(pid, name) {
        return None;
    }

    let name = if name.is_empty() {
        pid.to_string()
    } else {
        name.to_string()
    };
    let cpu_percent = f64::from(cpu_usage) / cpu_count.max(1) as f64;

    Some(Process {
        pid,
        ppid,
        name,
        memory_mb: Some(round2(memory_bytes as f64 / BYTES_PER_MB)),
        cpu_percent: Some(round2(cpu_percent)),
    })
}

/// 実行中プロセスを収集
///
/// 1回目のリフレッシュではCPU使用率が0なので、待ってから2回目を取る。
pub async fn collect_processes() -> Vec<Process> {
    let refresh_kind = ProcessRefreshKind::nothing().with_cpu().with_memory();

    let mut sys = System::new_with_specifics(
        RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing())
            .with_processes(refresh_kind),
    );

    tokio::time::sleep(CPU_SAMPLE_WAIT.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL)).await;
    sys.refresh_processes_specifics(ProcessesToUpdate::All, true, refresh_kind);

    let cpu_count = sys.cpus().len();

    let mut processes: Vec<Process> = sys
        .processes()
        .values()
        // スレッドはプロセスとして扱わない
        .filter(|process| process.thread_kind().is_none())
        .filter_map(|process| {
            process_record(
                Pid::from(process.pid().as_u32()),
                process.parent().map(|ppid| Pid::from(ppid.as_u32())),
                &process.name().to_string_lossy(),
                process.memory(),
                process.cpu_usage(),
                cpu_count,
            )
        })
        .collect();

    processes.sort_by_key(|process| process.pid);
    processes
}
