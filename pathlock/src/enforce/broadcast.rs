//! Run one raw syscall on every thread of the process.
//!
//! `prctl(PR_SET_NO_NEW_PRIVS)` and `landlock_restrict_self` only affect the
//! calling thread. To restrict the whole process, every other thread is sent a
//! dedicated real-time signal whose handler issues the same syscall and posts
//! its result. `/proc/self/task` is rescanned until a pass finds no thread
//! left to visit, so a thread spawned mid-broadcast by a sibling that was not
//! yet restricted is still caught. Threads spawned by a restricted thread
//! inherit its restriction. The calling thread goes last, which keeps
//! `/proc` readable for the scan.
//!
//! Threads must not block the broadcast signal, or the broadcast never
//! completes.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

const TASK_DIR: &str = "/proc/self/task";

const PENDING: i32 = -1;

static SERIAL: Mutex<()> = Mutex::new(());

static REQUEST_NR: AtomicI64 = AtomicI64::new(0);
static REQUEST_ARGS: [AtomicUsize; 3] = [const { AtomicUsize::new(0) }; 3];
static RESULT: AtomicI32 = AtomicI32::new(PENDING);

/// Set `no_new_privs` on every thread.
pub(crate) fn no_new_privs() -> io::Result<()> {
    all_threads(
        libc::SYS_prctl,
        [libc::PR_SET_NO_NEW_PRIVS as usize, 1, 0],
    )
}

/// Enforce the ruleset behind `ruleset_fd` on every thread.
pub(crate) fn restrict_self(ruleset_fd: libc::c_int) -> io::Result<()> {
    all_threads(libc::SYS_landlock_restrict_self, [ruleset_fd as usize, 0, 0])
}

fn broadcast_signal() -> libc::c_int {
    libc::SIGRTMAX() - 1
}

fn all_threads(nr: libc::c_long, args: [usize; 3]) -> io::Result<()> {
    let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);

    REQUEST_NR.store(i64::from(nr), Ordering::SeqCst);
    for (slot, arg) in REQUEST_ARGS.iter().zip(args) {
        slot.store(arg, Ordering::SeqCst);
    }

    let signal = broadcast_signal();
    let previous = install_handler(signal)?;
    let others = visit_other_threads(signal);
    restore_handler(signal, &previous);
    let visited = others?;
    tracing::trace!(syscall = nr, threads = visited + 1, "broadcast syscall");

    match raw_syscall(nr, args) {
        0 => Ok(()),
        errno => Err(io::Error::from_raw_os_error(errno)),
    }
}

fn visit_other_threads(signal: libc::c_int) -> io::Result<usize> {
    let pid = unsafe { libc::getpid() };
    let me = current_tid();
    let mut visited: HashSet<libc::pid_t> = HashSet::from([me]);

    loop {
        let pending: Vec<libc::pid_t> = list_threads()?
            .into_iter()
            .filter(|tid| !visited.contains(tid))
            .collect();
        if pending.is_empty() {
            return Ok(visited.len() - 1);
        }
        for tid in pending {
            run_on_thread(pid, tid, signal)?;
            visited.insert(tid);
        }
    }
}

fn run_on_thread(pid: libc::pid_t, tid: libc::pid_t, signal: libc::c_int) -> io::Result<()> {
    RESULT.store(PENDING, Ordering::SeqCst);

    let sent = unsafe { libc::syscall(libc::SYS_tgkill, pid, tid, signal) };
    if sent < 0 {
        let err = io::Error::last_os_error();
        // Thread exited between the scan and the signal.
        if err.raw_os_error() == Some(libc::ESRCH) {
            return Ok(());
        }
        return Err(err);
    }

    loop {
        match RESULT.load(Ordering::SeqCst) {
            PENDING => {
                if !thread_alive(tid) {
                    return Ok(());
                }
                std::thread::yield_now();
            }
            0 => return Ok(()),
            errno => return Err(io::Error::from_raw_os_error(errno)),
        }
    }
}

extern "C" fn on_broadcast(_signal: libc::c_int) {
    // SAFETY: only raw syscalls and atomics below; errno is restored for the
    // interrupted code.
    unsafe {
        let errno = libc::__errno_location();
        let saved = *errno;
        let nr = REQUEST_NR.load(Ordering::SeqCst) as libc::c_long;
        let args = [
            REQUEST_ARGS[0].load(Ordering::SeqCst),
            REQUEST_ARGS[1].load(Ordering::SeqCst),
            REQUEST_ARGS[2].load(Ordering::SeqCst),
        ];
        RESULT.store(raw_syscall(nr, args), Ordering::SeqCst);
        *errno = saved;
    }
}

/// Issue the syscall on the current thread, returning 0 or the errno.
fn raw_syscall(nr: libc::c_long, args: [usize; 3]) -> i32 {
    let ret = unsafe { libc::syscall(nr, args[0], args[1], args[2], 0usize, 0usize) };
    if ret < 0 {
        unsafe { *libc::__errno_location() }
    } else {
        0
    }
}

fn install_handler(signal: libc::c_int) -> io::Result<libc::sigaction> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_broadcast as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);

        let mut previous: libc::sigaction = std::mem::zeroed();
        if libc::sigaction(signal, &action, &mut previous) != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(previous)
    }
}

fn restore_handler(signal: libc::c_int, previous: &libc::sigaction) {
    let ret = unsafe { libc::sigaction(signal, previous, std::ptr::null_mut()) };
    if ret != 0 {
        tracing::warn!(
            signal,
            error = %io::Error::last_os_error(),
            "failed to restore broadcast signal handler"
        );
    }
}

fn current_tid() -> libc::pid_t {
    unsafe { libc::syscall(libc::SYS_gettid) as libc::pid_t }
}

fn list_threads() -> io::Result<Vec<libc::pid_t>> {
    let mut tids = Vec::new();
    for entry in std::fs::read_dir(TASK_DIR)? {
        let entry = entry?;
        if let Some(tid) = entry.file_name().to_str().and_then(|n| n.parse().ok()) {
            tids.push(tid);
        }
    }
    Ok(tids)
}

fn thread_alive(tid: libc::pid_t) -> bool {
    PathBuf::from(TASK_DIR).join(tid.to_string()).exists()
}
