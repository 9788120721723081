use crate::error::{ChainError, Result};
use crate::types::Block;
use log::info;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;

/// One mining attempt running on its own thread.
///
/// Workers share nothing, so several blocks can be mined in parallel. The
/// thread checks the cancel flag once per nonce and reports exactly once.
pub struct MiningWorker {
    cancel: Arc<AtomicBool>,
    result_receiver: flume::Receiver<Result<Block>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MiningWorker {
    pub fn spawn(mut block: Block, difficulty: u32) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let (result_sender, result_receiver) = flume::bounded(1);

        let flag = cancel.clone();
        // mining은 blocking function이므로 전용 thread에서 돌린다
        let handle = thread::spawn(move || {
            let result = block.mine_until(difficulty, &flag).map(|()| block);
            if let Ok(block) = &result {
                info!("worker mined block {}", block.hash);
            }
            // 받는 쪽이 이미 사라졌다면 결과는 버린다
            let _ = result_sender.send(result);
        });

        MiningWorker {
            cancel,
            result_receiver,
            handle: Some(handle),
        }
    }

    // 다음 nonce 시도 전에 멈춘다
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|handle| handle.is_finished())
    }

    pub fn try_result(&self) -> Option<Result<Block>> {
        self.result_receiver.try_recv().ok()
    }

    /// Blocks until the worker reports.
    pub fn wait(mut self) -> Result<Block> {
        let result = self
            .result_receiver
            .recv()
            .map_err(|_| ChainError::MinerDisconnected)?;
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        result
    }
}

impl Drop for MiningWorker {
    fn drop(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
