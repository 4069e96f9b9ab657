//! Criterion benchmarks for the executor's dispatch loop.
//!
//! Measures decode time and opcode throughput on a counting loop and on a
//! call-heavy loop, across iteration counts.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use neon_vm::{Bytecode, Executor, ExecutorConfig, OpCode};

#[path = "../tests/common/mod.rs"]
mod common;

use common::Assembler;

/// `g0 := 0; WHILE g0 < n DO g0 := g0 + 1 END`, optionally calling an empty
/// function on each iteration.
fn counting_loop(n: i32, with_call: bool) -> Vec<u8> {
    let mut asm = Assembler::new();
    asm.push_int(0).op_u32(OpCode::PushPG, 0).op(OpCode::StoreN);
    let top = asm.here();
    asm.op_u32(OpCode::PushPG, 0)
        .op(OpCode::LoadN)
        .push_int(n)
        .op(OpCode::LtN);
    let exit = asm.jump(OpCode::Jf);
    let call = if with_call {
        Some(asm.jump(OpCode::CallF))
    } else {
        None
    };
    asm.op_u32(OpCode::PushPG, 0)
        .op(OpCode::LoadN)
        .push_int(1)
        .op(OpCode::AddN)
        .op_u32(OpCode::PushPG, 0)
        .op(OpCode::StoreN)
        .op_u32(OpCode::Jump, top);
    let done = asm.here();
    asm.patch(exit, done);
    let over = asm.jump(OpCode::Jump);
    if let Some(call) = call {
        let entry = asm.here();
        asm.patch(call, entry);
        asm.op_u32x2(OpCode::Enter, 0, 2).op(OpCode::Leave).op(OpCode::Ret);
    }
    let end = asm.here();
    asm.patch(over, end);
    asm.build()
}

fn bench_decode(c: &mut Criterion) {
    let image = counting_loop(10, true);
    c.bench_function("decode_module", |b| {
        b.iter(|| Bytecode::decode(black_box(&image)).unwrap())
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    for &n in &[100, 1_000, 10_000] {
        for (label, with_call) in [("loop", false), ("loop_with_call", true)] {
            let module = Bytecode::decode(&counting_loop(n, with_call)).unwrap();
            group.throughput(Throughput::Elements(n as u64));
            group.bench_with_input(BenchmarkId::new(label, n), &module, |b, module| {
                b.iter(|| {
                    let mut vm = Executor::new(module, ExecutorConfig::default());
                    vm.run().unwrap();
                    black_box(vm.diagnostics().opcodes)
                })
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_dispatch);
criterion_main!(benches);
