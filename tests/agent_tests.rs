use pms_telemetry::{
    drivers::{
        DisplayBus, DisplayDriver, MessagingClient, NetworkDriver, Platform, SensorDriver,
        StatusIndicator,
    },
    Agent, AgentConfig, AgentError, BootstrapFailure, ConnectivityState, DisplayState, FaultCause,
    IpConfig, LinkStatus, Result, SensorSample, SmoothedRecord, DATA_TOPIC, HEARTBEAT_TOPIC,
};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Everything the fake collaborators observed.
#[derive(Default)]
struct Journal {
    lit: bool,
    toggles: usize,
    frames: Vec<Vec<String>>,
    pending: Vec<String>,
    polls: u32,
    published: Vec<(String, String)>,
}

type Shared = Arc<Mutex<Journal>>;

impl Journal {
    fn on_topic(&self, topic: &str) -> Vec<String> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

struct Led(Shared);

impl StatusIndicator for Led {
    fn set(&mut self, on: bool) {
        self.0.lock().unwrap().lit = on;
    }

    fn toggle(&mut self) {
        let mut j = self.0.lock().unwrap();
        j.lit = !j.lit;
        j.toggles += 1;
    }
}

struct Panel(Shared);

impl DisplayDriver for Panel {
    fn clear(&mut self) -> Result<()> {
        self.0.lock().unwrap().pending.clear();
        Ok(())
    }

    fn draw_text(&mut self, text: &str, _x: i32, _y: i32) -> Result<()> {
        self.0.lock().unwrap().pending.push(text.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut j = self.0.lock().unwrap();
        let frame = std::mem::take(&mut j.pending);
        j.frames.push(frame);
        Ok(())
    }
}

struct Bus {
    journal: Shared,
    addresses: Vec<u8>,
}

impl DisplayBus for Bus {
    type Display = Panel;

    fn scan(&mut self) -> Vec<u8> {
        self.addresses.clone()
    }

    fn open(self, _address: u8) -> Result<Panel> {
        Ok(Panel(self.journal))
    }
}

struct ScriptedSensor {
    samples: VecDeque<Result<SensorSample>>,
}

impl SensorDriver for ScriptedSensor {
    async fn read(&mut self) -> Result<SensorSample> {
        self.samples
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::sensor_error("no more frames")))
    }
}

struct FakeNetwork {
    journal: Shared,
    up_after: Option<u32>,
}

impl NetworkDriver for FakeNetwork {
    async fn activate(&mut self) -> Result<()> {
        Ok(())
    }

    async fn connect(&mut self, _ssid: &str, _password: &str) -> Result<()> {
        Ok(())
    }

    async fn status(&mut self) -> Result<LinkStatus> {
        let mut j = self.journal.lock().unwrap();
        j.polls += 1;
        match self.up_after {
            Some(n) if j.polls >= n => Ok(LinkStatus::Up),
            _ => Ok(LinkStatus::Joining),
        }
    }

    async fn ifconfig(&mut self) -> Result<IpConfig> {
        Ok(IpConfig {
            address: Ipv4Addr::new(192, 168, 1, 50),
            prefix_len: 24,
        })
    }
}

struct FakeBroker {
    journal: Shared,
    refuse_connect: bool,
    reject_publish: bool,
}

impl MessagingClient for FakeBroker {
    async fn connect(&mut self) -> Result<()> {
        if self.refuse_connect {
            return Err(AgentError::messaging_error("connection refused"));
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        if self.reject_publish {
            return Err(AgentError::messaging_error("not connected"));
        }
        self.journal
            .lock()
            .unwrap()
            .published
            .push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}

struct FakePlatform {
    journal: Shared,
    addresses: Vec<u8>,
    samples: Vec<Result<SensorSample>>,
    sensor_missing: bool,
    up_after: Option<u32>,
    refuse_connect: bool,
    reject_publish: bool,
}

impl FakePlatform {
    fn new(journal: &Shared) -> Self {
        Self {
            journal: journal.clone(),
            addresses: vec![0x3c],
            samples: Vec::new(),
            sensor_missing: false,
            up_after: Some(1),
            refuse_connect: false,
            reject_publish: false,
        }
    }

    fn with_samples(mut self, samples: &[(f64, f64, f64)]) -> Self {
        self.samples = samples
            .iter()
            .map(|&(a, b, c)| Ok(SensorSample::new(a, b, c)))
            .collect();
        self
    }

    fn headless(mut self) -> Self {
        self.addresses.clear();
        self
    }
}

impl Platform for FakePlatform {
    type Indicator = Led;
    type Bus = Bus;
    type Sensor = ScriptedSensor;
    type Network = FakeNetwork;
    type Messaging = FakeBroker;

    fn status_indicator(&mut self) -> Result<Led> {
        Ok(Led(self.journal.clone()))
    }

    fn display_bus(&mut self) -> Result<Bus> {
        Ok(Bus {
            journal: self.journal.clone(),
            addresses: self.addresses.clone(),
        })
    }

    fn sensor(&mut self) -> Result<ScriptedSensor> {
        if self.sensor_missing {
            return Err(AgentError::sensor_error("no such device /dev/serial0"));
        }
        Ok(ScriptedSensor {
            samples: std::mem::take(&mut self.samples).into(),
        })
    }

    fn network(&mut self) -> Result<FakeNetwork> {
        Ok(FakeNetwork {
            journal: self.journal.clone(),
            up_after: self.up_after,
        })
    }

    fn messaging(&mut self) -> Result<FakeBroker> {
        Ok(FakeBroker {
            journal: self.journal.clone(),
            refuse_connect: self.refuse_connect,
            reject_publish: self.reject_publish,
        })
    }
}

fn config(window_size: usize) -> AgentConfig {
    AgentConfig::new("home", "hunter2")
        .with_window_size(window_size)
        .with_max_attempts(5)
}

async fn boot(platform: &mut FakePlatform, config: &AgentConfig) -> Agent<FakePlatform> {
    let indicator = platform.status_indicator().unwrap();
    match Agent::boot(platform, indicator, config).await {
        Ok(agent) => agent,
        Err(fault) => panic!("boot failed: {}", fault.cause()),
    }
}

#[tokio::test(start_paused = true)]
async fn test_window_of_three_publishes_mean_on_third_cycle() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal).with_samples(&[
        (1.0, 4.0, 7.0),
        (2.0, 5.0, 8.0),
        (3.0, 6.0, 9.0),
    ]);
    platform.up_after = Some(2);
    let mut agent = boot(&mut platform, &config(3)).await;

    assert_eq!(agent.connectivity(), ConnectivityState::Connected);
    assert_eq!(agent.display_state(), DisplayState::Present);

    let first = assert_ok!(agent.run_cycle().await);
    assert_eq!(first.flushed, None);
    assert_eq!(first.remaining, 2);
    let second = assert_ok!(agent.run_cycle().await);
    assert_eq!(second.flushed, None);
    assert!(journal.lock().unwrap().on_topic(DATA_TOPIC).is_empty());

    let third = assert_ok!(agent.run_cycle().await);
    let expected = SmoothedRecord {
        pm1_0: 2.0,
        pm2_5: 5.0,
        pm10: 8.0,
    };
    assert_eq!(third.flushed, Some(expected));
    assert_eq!(third.remaining, 3);
    assert_eq!(agent.latest(), Some(&expected));
    assert!(agent.window().is_empty());
    assert_eq!(agent.cycles(), 3);

    let j = journal.lock().unwrap();
    let data = j.on_topic(DATA_TOPIC);
    assert_eq!(data.len(), 1);
    let published: SmoothedRecord = serde_json::from_str(&data[0]).unwrap();
    assert_eq!(published, expected);
    assert_eq!(j.on_topic(HEARTBEAT_TOPIC), vec!["pong"; 3]);
    assert_eq!(j.polls, 2);

    let frames: Vec<Vec<&str>> = j
        .frames
        .iter()
        .map(|f| f.iter().map(String::as_str).collect())
        .collect();
    assert_eq!(
        frames,
        vec![
            vec!["Init driver..."],
            vec!["Setup network..."],
            vec!["Getting data..."],
            vec!["Waiting for data", "Next in 2"],
            vec!["Waiting for data", "Next in 1"],
            vec!["PM1.0  2.0", "PM2.5  5.0", "PM10   8.0", "Next in 3"],
        ]
    );
    assert_eq!(j.toggles, 0);
    assert!(!j.lit);
}

#[tokio::test(start_paused = true)]
async fn test_network_exhaustion_faults_after_max_attempts() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal).headless();
    platform.up_after = None;
    let config = config(3);

    let indicator = platform.status_indicator().unwrap();
    let started = tokio::time::Instant::now();
    let fault = match Agent::boot(&mut platform, indicator, &config).await {
        Ok(_) => panic!("network never came up, boot must fault"),
        Err(fault) => fault,
    };

    assert_eq!(started.elapsed(), Duration::from_secs(4));
    assert_eq!(journal.lock().unwrap().polls, 5);
    assert!(matches!(
        fault.cause(),
        FaultCause::Network(BootstrapFailure::AttemptsExhausted(5))
    ));
    assert_eq!(fault.cause().message(), "Network error");
    assert_eq!(fault.display_state(), DisplayState::Absent);

    // "Init driver..." and "Setup network..." each toggled the headless LED
    let before = journal.lock().unwrap().toggles;
    assert_eq!(before, 2);

    assert_err!(tokio::time::timeout(Duration::from_secs(2), fault.signal()).await);

    let j = journal.lock().unwrap();
    assert!(j.toggles >= before + 8, "toggles: {}", j.toggles);
    assert_eq!(j.polls, 5);
    assert!(j.published.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fault_never_resumes() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal);
    platform.up_after = None;

    let outcome = tokio::time::timeout(Duration::from_secs(60), Agent::start(platform, config(3))).await;
    assert_err!(outcome);

    let j = journal.lock().unwrap();
    assert_eq!(j.polls, 5);
    assert_eq!(j.frames.last().unwrap(), &vec!["Network error".to_string()]);
    assert!(j.toggles > 100);
}

#[tokio::test(start_paused = true)]
async fn test_headless_render_toggles_once_per_cycle() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal)
        .headless()
        .with_samples(&[(1.0, 1.0, 1.0), (2.0, 2.0, 2.0)]);
    let mut agent = boot(&mut platform, &config(3)).await;
    assert_eq!(agent.display_state(), DisplayState::Absent);

    let before = journal.lock().unwrap().toggles;
    assert_ok!(agent.run_cycle().await);
    assert_ok!(agent.run_cycle().await);

    let j = journal.lock().unwrap();
    assert_eq!(j.toggles, before + 2);
    assert!(j.frames.is_empty());
    assert_eq!(j.on_topic(HEARTBEAT_TOPIC).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_read_leaves_window_untouched() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal);
    platform.samples = vec![
        Ok(SensorSample::new(1.0, 2.0, 3.0)),
        Err(AgentError::sensor_error("checksum mismatch")),
        Ok(SensorSample::new(f64::NAN, 2.0, 3.0)),
    ];
    let mut agent = boot(&mut platform, &config(3)).await;

    assert_ok!(agent.run_cycle().await);
    assert_eq!(agent.window().len(), 1);

    assert_err!(agent.run_cycle().await);
    assert_eq!(agent.window().len(), 1);
    assert_err!(agent.run_cycle().await);
    assert_eq!(agent.window().len(), 1);

    assert_eq!(agent.latest(), None);
    assert_eq!(agent.cycles(), 1);
    assert_eq!(journal.lock().unwrap().on_topic(HEARTBEAT_TOPIC).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sampling_failure_ends_in_sensor_fault() {
    let journal = Shared::default();
    let platform = FakePlatform::new(&journal).with_samples(&[(5.0, 5.0, 5.0)]);

    let outcome = tokio::time::timeout(Duration::from_secs(10), Agent::start(platform, config(3))).await;
    assert_err!(outcome);

    let j = journal.lock().unwrap();
    assert_eq!(j.on_topic(HEARTBEAT_TOPIC).len(), 1);
    assert!(j.on_topic(DATA_TOPIC).is_empty());
    assert_eq!(j.frames.last().unwrap(), &vec!["Sensor error".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_publish_failures_do_not_stop_the_cycle() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal).with_samples(&[(4.0, 5.0, 6.0)]);
    platform.reject_publish = true;
    let mut agent = boot(&mut platform, &config(1)).await;

    let report = assert_ok!(agent.run_cycle().await);
    assert_eq!(report.publish_failures, 2);
    assert!(report.flushed.is_some());
    assert_eq!(agent.latest().map(|r| r.pm10), Some(6.0));
    assert_eq!(agent.cycles(), 1);

    let j = journal.lock().unwrap();
    assert_eq!(
        j.frames.last().unwrap(),
        &vec!["PM1.0  4.0", "PM2.5  5.0", "PM10   6.0", "Next in 1"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_sensor_init_failure_skips_network() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal);
    platform.sensor_missing = true;

    let indicator = platform.status_indicator().unwrap();
    let fault = match Agent::boot(&mut platform, indicator, &config(3)).await {
        Ok(_) => panic!("sensor is missing, boot must fault"),
        Err(fault) => fault,
    };

    assert!(matches!(fault.cause(), FaultCause::SensorInit(_)));
    assert_eq!(fault.cause().message(), "Sensor error");
    assert_eq!(journal.lock().unwrap().polls, 0);
}

#[tokio::test(start_paused = true)]
async fn test_broker_refusal_is_an_mqtt_fault() {
    let journal = Shared::default();
    let mut platform = FakePlatform::new(&journal);
    platform.refuse_connect = true;

    let indicator = platform.status_indicator().unwrap();
    let fault = match Agent::boot(&mut platform, indicator, &config(3)).await {
        Ok(_) => panic!("broker refused, boot must fault"),
        Err(fault) => fault,
    };

    assert!(matches!(fault.cause(), FaultCause::Messaging(_)));
    assert_eq!(fault.cause().message(), "MQTT error");
    assert_eq!(journal.lock().unwrap().polls, 1);
}
