//! # Kernel Tracing helpers

use crate::KernelConfig;
use log::info;

pub fn trace_config(config: &KernelConfig) {
    info!(
        concat!(
            "Kernel configuration:\n",
            "  bcache = {nr_buffers} buffers x {block_size} bytes, {hashtab_size} hash chains, {reserved} reserved blocks\n",
            "  sched  = {nr_procs} slots, quantum {quantum}, normalization {normalization}, nice {nice}, seed {seed:#018x}"
        ),
        nr_buffers = config.cache.nr_buffers,
        block_size = config.cache.block_size,
        hashtab_size = config.cache.hashtab_size,
        reserved = config.cache.reserved_blocks,
        nr_procs = config.sched.nr_procs,
        quantum = config.sched.quantum,
        normalization = config.sched.normalization,
        nice = config.sched.default_nice,
        seed = config.seed,
    );
}
