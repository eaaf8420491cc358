#![no_main]

use libfuzzer_sys::fuzz_target;
use teebee_dsp::FilterCore;

const CONTROL_BYTES: usize = 6;

fn unit(byte: u8) -> f64 {
    f64::from(byte) / 255.0
}

// Each packet is six control bytes followed by up to 64 little-endian f32
// samples. Samples may be NaN or infinite.
fuzz_target!(|data: &[u8]| {
    let mut filter = FilterCore::new();
    if !filter.set_sample_rate(44_100.0) {
        return;
    }

    for packet in data.chunks(CONTROL_BYTES + 64 * 4) {
        if packet.len() < CONTROL_BYTES {
            break;
        }
        let (control, samples) = packet.split_at(CONTROL_BYTES);
        filter.set_mode_index(usize::from(control[0] % 8));
        filter.set_cutoff(20.0 + unit(control[1]) * 19_980.0);
        filter.set_resonance(unit(control[2]));
        filter.set_drive_db(unit(control[3]) * 120.0 - 60.0);
        filter.set_feedback_hp(20.0 + unit(control[4]) * 19_980.0);
        filter.set_feedback_amount(unit(control[5]));

        for bytes in samples.chunks_exact(4) {
            let sample = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let out = filter.process_sample(sample);
            assert!(out.is_finite() && out.abs() <= 2.0, "output {out}");
            assert!(filter
                .stages()
                .iter()
                .all(|stage| stage.is_finite() && stage.abs() <= 2.0));
        }
    }
});
