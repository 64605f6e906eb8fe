//! Trust Boundary Walkthrough
//!
//! Run with: cargo run -p membrane --example sandbox_add

use membrane::{
    AbiValue, BoundaryError, NoopBackend, Sandbox, SandboxConfig, SbxPtr, Tainted,
};

fn main() -> membrane::Result<()> {
    tracing_subscriber::fmt().init();

    println!("=== Trust Boundary Walkthrough ===\n");

    let mut backend = NoopBackend::new(64 * 1024)?;

    // Host closures stand in for the untrusted component's functions.
    let add = backend.register(|_heap, args| {
        let (AbiValue::I32(a), AbiValue::I32(b)) = (args[0], args[1]) else {
            return Err(BoundaryError::Backend("add expects two i32".to_string()));
        };
        Ok(Some(AbiValue::I32(a.wrapping_add(b))))
    });
    let sum_array = backend.register(|heap, args| {
        let (AbiValue::U32(ptr), AbiValue::U32(len)) = (args[0], args[1]) else {
            return Err(BoundaryError::Backend(
                "sum expects (ptr, len) as u32".to_string(),
            ));
        };
        let mut total = 0i32;
        for i in 0..len as usize {
            let at = ptr as usize + i * 4;
            let bytes: [u8; 4] = heap[at..at + 4]
                .try_into()
                .map_err(|_| BoundaryError::Backend("short read".to_string()))?;
            total = total.wrapping_add(i32::from_le_bytes(bytes));
        }
        Ok(Some(AbiValue::I32(total)))
    });

    // A 32-bit guest data model: pointers cross the boundary as u32 offsets.
    let mut sandbox = Sandbox::new(backend, SandboxConfig::wasm32())?;

    // Scalars: raw and tainted arguments mix freely, results come back
    // tainted and must be verified before use.
    let sum: Tainted<i32> = sandbox.invoke(add, &[&5i32, &Tainted::new(7i32)])?;
    let sum = sum.copy_and_verify(|v| {
        if v >= 0 {
            Ok(v)
        } else {
            Err(BoundaryError::Conversion("negative sum".to_string()))
        }
    })?;
    println!("add(5, 7) = {sum}");

    // Pointers: allocate inside the sandbox heap, write through a live
    // view, hand the tainted pointer back to the component.
    let array: Tainted<SbxPtr<i32>> = sandbox.alloc::<i32>(3)?;
    let view = array.deref(&sandbox)?;
    view.write_raw(10)?;
    // Remaining elements stay zero (the heap is zero-initialized).

    let total: Tainted<i32> = sandbox.invoke(sum_array, &[&array, &3u32])?;
    println!("sum_array(ptr, 3) = {}", total.unverified());

    sandbox.free(array)?;

    println!("\n=== Done ===");
    Ok(())
}
