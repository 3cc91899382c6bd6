//! Asset loading with a frame scope and a persistent scope.
//!
//! Raw file bytes are read into the frame arena and thrown away at the end
//! of the frame. Decoded pixels go into the persistent free list and live
//! until the asset is unloaded.
//!
//! Run with: cargo run --example asset_loading

use std::ptr::NonNull;

use scopealloc::{format_bytes, kb, mb, AllocConfig, Allocator, MemoryScope, Scopes};

/// A decoded image living in the persistent scope.
struct Texture {
    name: &'static str,
    pixels: NonNull<u32>,
    width: usize,
    height: usize,
}

/// Fake file contents: a run-length encoded image of `(count, color)` pairs.
fn read_file(frame: &mut Allocator, width: usize, height: usize, color: u8) -> (NonNull<u8>, usize) {
    let runs = (width * height + 254) / 255;
    let len = runs * 2;
    let file = frame.allocate(len, 16).expect("frame scope exhausted");

    let mut remaining = width * height;
    for run in 0..runs {
        let count = remaining.min(255);
        unsafe {
            *file.as_ptr().add(run * 2) = count as u8;
            *file.as_ptr().add(run * 2 + 1) = color;
        }
        remaining -= count;
    }

    (file, len)
}

fn load_texture(scopes: &mut Scopes, name: &'static str, width: usize, height: usize, color: u8) -> Texture {
    let (frame, persistent) = scopes.split();

    // Temporary: only needed while decoding.
    let (file, len) = read_file(frame, width, height, color);

    // Persistent: survives until unload.
    let pixels = persistent
        .alloc_array::<u32>(width * height)
        .expect("persistent scope exhausted");

    let mut written = 0;
    for run in 0..len / 2 {
        let (count, color) = unsafe { (*file.as_ptr().add(run * 2), *file.as_ptr().add(run * 2 + 1)) };
        let rgba = u32::from_be_bytes([color, color, color, 0xFF]);
        for _ in 0..count {
            unsafe { pixels.as_ptr().add(written).write(rgba) };
            written += 1;
        }
    }

    println!(
        "   Loaded '{}' ({}x{}): {} file bytes -> {} pixel bytes",
        name,
        width,
        height,
        len,
        format_bytes(width * height * 4)
    );

    Texture { name, pixels, width, height }
}

fn unload_texture(scopes: &mut Scopes, texture: Texture) {
    unsafe { scopes.persistent().deallocate(texture.pixels.as_ptr().cast()) };
    println!("   Unloaded '{}'", texture.name);
}

fn main() {
    println!("=== Asset Loading Example ===\n");

    let config = AllocConfig::default()
        .with_frame_arena_size(kb(256))
        .with_persistent_size(mb(4));
    let mut scopes = Scopes::new(&config).expect("failed to create scopes");

    println!("1. Loading level assets...");
    scopes.begin_frame();
    let grass = load_texture(&mut scopes, "grass", 128, 128, 0x40);
    let stone = load_texture(&mut scopes, "stone", 256, 128, 0x80);
    let sky = load_texture(&mut scopes, "sky", 256, 256, 0xC0);
    scopes.end_frame();

    let (frame_stats, persistent_stats) = scopes.stats();
    println!("   Frame scope after end_frame: {}", frame_stats);
    println!("   Persistent scope: {}", persistent_stats);

    println!("\n2. Streaming: unload stone, load a larger replacement...");
    scopes.begin_frame();
    unload_texture(&mut scopes, stone);
    let cliff = load_texture(&mut scopes, "cliff", 256, 192, 0x60);
    scopes.end_frame();

    let (_, persistent_stats) = scopes.stats();
    println!(
        "   Free blocks: {}, largest: {}, fragmentation: {:.1}%",
        persistent_stats.free_blocks,
        format_bytes(persistent_stats.largest_free_block),
        persistent_stats.fragmentation() * 100.0
    );

    println!("\n3. Sampling...");
    for texture in [&grass, &cliff, &sky] {
        let center = texture.width * (texture.height / 2) + texture.width / 2;
        let pixel = unsafe { *texture.pixels.as_ptr().add(center) };
        println!("   '{}' center pixel: {:#010x}", texture.name, pixel);
    }

    println!("\n4. Unloading everything...");
    for texture in [grass, cliff, sky] {
        unload_texture(&mut scopes, texture);
    }

    let (frame_stats, persistent_stats) = scopes.stats();
    println!("   Frames run: {}", scopes.frame_number());
    println!("   Frame peak: {}", format_bytes(frame_stats.peak_used));
    println!("   Persistent in use: {}", format_bytes(persistent_stats.used));
    println!("   Persistent free blocks: {}", persistent_stats.free_blocks);

    scopes.destroy();
    println!("\n=== Done ===");
}
