use chip8_vm::memory::CHIP8_FONT;
use chip8_vm::{Chip8Interpreter, Chip8State, Quirks, RunState, Step};

fn boot(program: &[u8]) -> (Chip8Interpreter, Chip8State) {
    let mut state = Chip8State::new();
    let mut prog = program;
    state.load_program(&mut prog).unwrap();
    (Chip8Interpreter::with_seed(Quirks::default(), 0), state)
}

#[test]
fn add_two_registers() {
    let (mut interp, mut state) = boot(&[0x60, 0x0A, 0x61, 0x05, 0x80, 0x14]);
    for _ in 0..3 {
        assert_eq!(interp.step(&mut state), Ok(Step::Executed));
    }
    assert_eq!(state.register(0), 15);
    assert_eq!(state.register(0xF), 0);
    assert_eq!(state.program_counter, 0x206);
}

#[test]
fn draw_glyph_zero() {
    let (mut interp, mut state) = boot(&[0xA2, 0x00, 0x60, 0x00, 0x61, 0x00, 0xD0, 0x15]);
    // ANNN with 0x200 points I at the program itself, so the sprite is the
    // first five bytes of the program
    for _ in 0..4 {
        interp.step(&mut state).unwrap();
    }
    let display = state.display();
    for row in 0..5 {
        assert_eq!(display[row * 8], [0xA2, 0x00, 0x60, 0x00, 0x61][row]);
    }
    assert_eq!(state.register(0xF), 0);

    // again, with I on glyph 0 (F029 with V0 = 0)
    let (mut interp, mut state) = boot(&[0xF0, 0x29, 0x60, 0x00, 0x61, 0x00, 0xD0, 0x15]);
    for _ in 0..4 {
        interp.step(&mut state).unwrap();
    }
    let display = state.display();
    for row in 0..5 {
        assert_eq!(display[row * 8], CHIP8_FONT[row]);
        assert_eq!(display[row * 8 + 1], 0);
    }
    assert_eq!(state.register(0xF), 0);
    assert_eq!(state.program_counter, 0x208);
}

#[test]
fn clear_screen_zeroes_display() {
    let (mut interp, mut state) = boot(&[0xD0, 0x15, 0x00, 0xE0]);
    interp.step(&mut state).unwrap();
    assert!(state.display().iter().any(|&b| b != 0));
    interp.step(&mut state).unwrap();
    assert_eq!(state.display(), &[0u8; 256][..]);
}

#[test]
fn drawing_twice_restores_screen() {
    // glyph 8 at (30, 12), twice
    let (mut interp, mut state) = boot(&[
        0x60, 0x08, 0xF0, 0x29, 0x61, 0x1E, 0x62, 0x0C, 0xD1, 0x25, 0xD1, 0x25,
    ]);
    for _ in 0..4 {
        interp.step(&mut state).unwrap();
    }
    let before = state.display().to_vec();
    interp.step(&mut state).unwrap();
    assert_ne!(state.display(), &before[..]);
    assert_eq!(state.register(0xF), 0);
    interp.step(&mut state).unwrap();
    assert_eq!(state.display(), &before[..]);
    assert_eq!(state.register(0xF), 1);
}

#[test]
fn call_then_return() {
    // 0x200: call 0x206; 0x202: spin; 0x206: return
    let (mut interp, mut state) = boot(&[0x22, 0x06, 0x12, 0x02, 0x00, 0x00, 0x00, 0xEE]);
    let sp = state.stack_pointer;
    interp.step(&mut state).unwrap();
    assert_eq!(state.program_counter, 0x206);
    assert_eq!(state.stack_pointer, sp - 2);
    interp.step(&mut state).unwrap();
    assert_eq!(state.program_counter, 0x202);
    assert_eq!(state.stack_pointer, sp);
    assert_eq!(
        interp.step(&mut state),
        Ok(Step::InfiniteLoop { addr: 0x202 })
    );
}

#[test]
fn nested_calls_unwind_in_order() {
    // 0x200: call 0x300; 0x202: spin
    // 0x300: call 0x400; 0x302: return
    // 0x400: return
    let mut program = vec![0u8; 0x202];
    program[0..4].copy_from_slice(&[0x23, 0x00, 0x12, 0x02]);
    program[0x100..0x104].copy_from_slice(&[0x24, 0x00, 0x00, 0xEE]);
    program[0x200..0x202].copy_from_slice(&[0x00, 0xEE]);
    let (mut interp, mut state) = boot(&program);
    let pcs: Vec<u16> = (0..4)
        .map(|_| {
            interp.step(&mut state).unwrap();
            state.program_counter
        })
        .collect();
    assert_eq!(pcs, vec![0x300, 0x400, 0x302, 0x202]);
    assert_eq!(state.stack_pointer, 0x0ed0);
}

#[test]
fn key_wait_two_phase() {
    let (mut interp, mut state) = boot(&[0xF5, 0x0A]);
    assert_eq!(interp.step(&mut state), Ok(Step::AwaitingKey));
    assert_eq!(state.program_counter, 0x200);
    assert_eq!(state.run_state(), RunState::AwaitingKey);
    assert_eq!(interp.step(&mut state), Ok(Step::AwaitingKey));
    assert_eq!(state.program_counter, 0x200);
    assert!(state.is_awaiting_key());

    state.set_key(0x9, true).unwrap();
    state.set_key(0xE, true).unwrap();
    assert_eq!(interp.step(&mut state), Ok(Step::Executed));
    assert_eq!(state.register(5), 0x9);
    assert_eq!(state.program_counter, 0x202);
    assert_eq!(state.run_state(), RunState::Running);
}

#[test]
fn key_already_down_still_takes_two_steps() {
    let (mut interp, mut state) = boot(&[0xF0, 0x0A]);
    state.set_key(0x1, true).unwrap();
    assert_eq!(interp.step(&mut state), Ok(Step::AwaitingKey));
    assert_eq!(interp.step(&mut state), Ok(Step::Executed));
    assert_eq!(state.register(0), 1);
}

#[test]
fn timers_keep_running_while_waiting_for_a_key() {
    let (mut interp, mut state) = boot(&[0x60, 0x05, 0xF0, 0x15, 0xF1, 0x0A]);
    for _ in 0..5 {
        interp.step(&mut state).unwrap();
    }
    assert_eq!(state.delay_timer(), 2);
    assert!(state.is_awaiting_key());
}

#[test]
fn writes_into_display_memory_show_on_screen() {
    // I = 0xF00; V0 = 0xFF; dump V0 there
    let (mut interp, mut state) = boot(&[0xAF, 0x00, 0x60, 0xFF, 0xF0, 0x55]);
    for _ in 0..3 {
        interp.step(&mut state).unwrap();
    }
    assert_eq!(state.display()[0], 0xFF);
    assert!((0..8).all(|x| state.pixel(x, 0)));
}

#[test]
fn countdown_loop() {
    // V0 = 3; loop: V0 += 0xFF (i.e. -1); skip if V0 == 0; jump loop; spin
    let program = [
        0x60, 0x03, // 0x200
        0x70, 0xFF, // 0x202
        0x30, 0x00, // 0x204
        0x12, 0x02, // 0x206
        0x12, 0x08, // 0x208
    ];
    let (mut interp, mut state) = boot(&program);
    let mut steps = 0;
    loop {
        steps += 1;
        if let Step::InfiniteLoop { addr } = interp.step(&mut state).unwrap() {
            assert_eq!(addr, 0x208);
            break;
        }
        assert!(steps < 100);
    }
    assert_eq!(state.register(0), 0);
    assert_eq!(steps, 1 + 3 * 2 + 2 + 1);
}
