// End-to-end tests: transmitter at 44.1 kHz, linear resampling to the
// receiver rate, then the full receiver state machine.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tonelink_core::resample::resample;
use tonelink_core::{
    BitString, CancelToken, Correction, LinkConfig, LinkError, MemorySink, MemorySource,
    Receiver, Reception, Stage, SyncPolicy, Transmitter,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Transmit `payload` with `flips` and return the audio at the receiver rate
fn transmit(config: &LinkConfig, payload: &str, flips: &[usize]) -> Vec<f32> {
    let payload: BitString = payload.parse().expect("Invalid payload");
    let transmitter = Transmitter::new(config).expect("Failed to create transmitter");
    let mut sink = MemorySink::new(config.tx.sample_rate);
    transmitter
        .send(&payload, flips, &mut sink)
        .expect("Failed to transmit");
    resample(&sink.into_samples(), config.tx.sample_rate, config.rx.sample_rate)
}

fn receive(config: &LinkConfig, samples: Vec<f32>) -> Result<Reception, LinkError> {
    let mut source = MemorySource::new(samples, config.rx.sample_rate);
    let mut receiver = Receiver::new(config).expect("Failed to create receiver");
    receiver.receive(&mut source, &CancelToken::new())
}

fn add_noise(samples: &mut [f32], sigma: f32, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).expect("Invalid noise distribution");
    for sample in samples.iter_mut() {
        *sample += normal.sample(&mut rng);
    }
}

#[test]
fn test_loopback_clean_frame() {
    init_logging();
    let config = LinkConfig::default();
    let reception = receive(&config, transmit(&config, "1010", &[])).expect("Failed to receive");

    assert_eq!(reception.message.to_string(), "1010");
    assert_eq!(reception.codeword.to_string(), "101010000110011");
    assert_eq!(reception.correction, Correction::Clean);
    assert!(reception.frame.suspected_flips.is_empty());
}

#[test]
fn test_loopback_corrects_single_flip() {
    init_logging();
    let config = LinkConfig::default();
    let reception = receive(&config, transmit(&config, "1010", &[3])).expect("Failed to receive");

    assert_eq!(reception.message.to_string(), "1010");
    assert_eq!(
        reception.correction,
        Correction::Corrected { flipped: vec![3] }
    );
    // The frame keeps what was actually heard
    assert_eq!(reception.frame.codeword.to_string(), "101110000110011");
}

#[test]
fn test_loopback_corrects_two_flips() {
    init_logging();
    let config = LinkConfig::default();
    let reception =
        receive(&config, transmit(&config, "1010", &[1, 12])).expect("Failed to receive");

    assert_eq!(reception.message.to_string(), "1010");
    assert_eq!(reception.correction.flipped(), &[1, 12]);
}

#[test]
fn test_loopback_three_flips_uncorrectable() {
    init_logging();
    let config = LinkConfig::default();
    match receive(&config, transmit(&config, "1010", &[0, 5, 10])) {
        Err(LinkError::Uncorrectable { received, .. }) => {
            assert_eq!(received.to_string(), "001011000100011");
        }
        other => panic!("Expected Uncorrectable, got {:?}", other),
    }
}

#[test]
fn test_loopback_twenty_bit_payload_with_two_flips() {
    init_logging();
    let config = LinkConfig::default();
    let payload = "11001011100101101001";
    let reception =
        receive(&config, transmit(&config, payload, &[7, 25])).expect("Failed to receive");

    assert_eq!(reception.message.to_string(), payload);
    assert_eq!(reception.frame.length, 31);
    assert_eq!(reception.correction.flipped(), &[7, 25]);
}

#[test]
fn test_loopback_repeated_nibbles() {
    init_logging();
    let config = LinkConfig::default();
    // All-zero payload has an all-zero CRC: a long run of the same tone
    let reception = receive(&config, transmit(&config, "0000", &[])).expect("Failed to receive");

    assert_eq!(reception.message.to_string(), "0000");
    assert_eq!(reception.codeword, BitString::zeros(15));
    assert_eq!(reception.correction, Correction::Clean);
}

#[test]
fn test_loopback_reports_padding_flip() {
    init_logging();
    let config = LinkConfig::default();
    let reception = receive(&config, transmit(&config, "1010", &[15])).expect("Failed to receive");

    assert_eq!(reception.message.to_string(), "1010");
    assert_eq!(reception.correction, Correction::Clean);
    assert_eq!(reception.frame.suspected_flips, vec![15]);
}

#[test]
fn test_loopback_with_leading_silence() {
    init_logging();
    let config = LinkConfig::default();
    // Silence that is not a whole number of blocks shifts every block boundary
    let mut samples = vec![0.0; 5917];
    samples.extend(transmit(&config, "110100111", &[]));
    samples.extend(vec![0.0; 3000]);

    let reception = receive(&config, samples).expect("Failed to receive");
    assert_eq!(reception.message.to_string(), "110100111");
}

#[test]
fn test_loopback_with_noise() {
    init_logging();
    let config = LinkConfig::default();
    let mut samples = vec![0.0; 2345];
    samples.extend(transmit(&config, "10011", &[2]));
    add_noise(&mut samples, 0.05, 42);

    let reception = receive(&config, samples).expect("Failed to receive");
    assert_eq!(reception.message.to_string(), "10011");
    assert_eq!(reception.correction.flipped(), &[2]);
}

#[test]
fn test_loopback_cumulative_sync_policy() {
    init_logging();
    let mut config = LinkConfig::default();
    config.rx.sync_policy = SyncPolicy::Cumulative;
    let reception = receive(&config, transmit(&config, "0110", &[])).expect("Failed to receive");
    assert_eq!(reception.message.to_string(), "0110");
}

#[test]
fn test_sync_timeout_on_silence() {
    init_logging();
    let mut config = LinkConfig::default();
    config.rx.sync_timeout = 2.0;
    let samples = vec![0.0; config.rx.sample_rate as usize * 5];

    assert!(matches!(
        receive(&config, samples),
        Err(LinkError::Timeout {
            stage: Stage::AwaitingPreamble
        })
    ));
}

#[test]
fn test_cancelled_reception() {
    init_logging();
    let config = LinkConfig::default();
    let mut source = MemorySource::new(transmit(&config, "1010", &[]), config.rx.sample_rate);
    let mut receiver = Receiver::new(&config).expect("Failed to create receiver");
    let cancel = CancelToken::new();
    cancel.cancel();

    assert!(matches!(
        receiver.receive(&mut source, &cancel),
        Err(LinkError::Cancelled)
    ));
}

#[test]
fn test_truncated_transmission() {
    init_logging();
    let config = LinkConfig::default();
    let mut samples = transmit(&config, "1010", &[]);
    samples.truncate(samples.len() / 2);

    assert!(matches!(
        receive(&config, samples),
        Err(LinkError::Truncated)
    ));
}
