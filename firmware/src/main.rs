#![feature(type_alias_impl_trait)]
#![no_std]
#![no_main]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::wildcard_imports)]

mod dac;
mod rtd;
mod tick_timer;

use defmt_rtt as _;
use panic_probe as _;
use rtic_monotonics::{stm32::Tim2, Monotonic};
use tec_ctl::{Clock, ControlFlag};

/// The interrupt/main-loop handshake. The TIM3 ISR raises it; the control
/// loop in `idle` takes it. Nothing else is shared across contexts.
static CONTROL_FLAG: ControlFlag = ControlFlag::new();

/// Millisecond clock over the TIM2 monotonic. Wraps after ~49 days.
struct MonoClock;

impl Clock for MonoClock {
    fn now(&mut self) -> tec_ctl::tick::Instant {
        let ms = Tim2::now().duration_since_epoch().to_millis();
        tec_ctl::tick::Instant::from_ticks(ms as u32)
    }
}

#[rtic::app(device = stm32f0xx_hal::pac, dispatchers = [USART1, TIM14])]
mod app {
    use defmt::*;
    use rtic_monotonics::stm32::{Tim2 as Mono, *};
    use stm32f0xx_hal::{
        delay::Delay,
        gpio::{
            gpioa::{PA15, PA2, PA4, PA5, PA6, PA7},
            gpiob::{PB0, PB1, PB4},
            Alternate, Output, Pin, PushPull, AF0, AF1,
        },
        pac::{IWDG, SPI1, USART2},
        prelude::*,
        serial::Serial,
        spi::{EightBit, Spi},
        watchdog::Watchdog,
    };
    use tec_ctl::{BangBang, DacCode, Dac as _, TempController};

    use crate::{
        dac::TecDac,
        rtd::Rtd,
        tick_timer::{LockedTick, TickTimer},
        MonoClock, CONTROL_FLAG,
    };

    type Usart = Serial<USART2, PA2<Alternate<AF1>>, PA15<Alternate<AF1>>>;
    type RtdSpi = Spi<SPI1, PA5<Alternate<AF0>>, PA6<Alternate<AF0>>, PA7<Alternate<AF0>>, EightBit>;
    type RtdSensor = Rtd<RtdSpi, PA4<Output<PushPull>>, Delay>;
    type TecDacOut = TecDac<PB0<Output<PushPull>>, PB1<Output<PushPull>>, PB4<Output<PushPull>>>;

    #[shared]
    struct Shared {
        tick: TickTimer,
    }

    #[local]
    struct Local {
        usart: Option<Usart>,
        rtd: Option<RtdSensor>,
        dac: Option<TecDacOut>,
    }

    #[init]
    fn init(mut cx: init::Context) -> (Shared, Local) {
        // Set system clock to 24 MHz
        let mut rcc = cx
            .device
            .RCC
            .configure()
            .hsi48()
            .sysclk(24.mhz())
            .pclk(24.mhz())
            .hclk(24.mhz())
            .freeze(&mut cx.device.FLASH);

        trace!("sysclk: {}", rcc.clocks.sysclk().0);

        // Enable tim2 monotonic
        let token = rtic_monotonics::create_stm32_tim2_monotonic_token!();
        Mono::start(24_000_000, token);

        // Setup systick delay, consumed by the RTD front end
        let delay = Delay::new(cx.core.SYST, &rcc);

        // Setup GPIO
        let gpioa = cx.device.GPIOA.split(&mut rcc);
        let gpiob = cx.device.GPIOB.split(&mut rcc);
        let pb3 = gpiob.pb3.into_push_pull_output(&cx.cs);

        let _ = blinky::spawn(pb3.downgrade());
        let _ = watchdog::spawn(cx.device.IWDG);

        // Setup USART. No RX interrupt: the control loop polls it.
        let usart = Serial::usart2(
            cx.device.USART2,
            (
                gpioa.pa2.into_alternate_af1(&cx.cs),
                gpioa.pa15.into_alternate_af1(&cx.cs),
            ),
            115_200.bps(),
            &mut rcc,
        );

        // Setup RTD converter on SPI1
        let spi = Spi::spi1(
            cx.device.SPI1,
            (
                gpioa.pa5.into_alternate_af0(&cx.cs),
                gpioa.pa6.into_alternate_af0(&cx.cs),
                gpioa.pa7.into_alternate_af0(&cx.cs),
            ),
            embedded_hal::spi::MODE_1,
            1.mhz(),
            &mut rcc,
        );
        let mut rtd_cs = gpioa.pa4.into_push_pull_output(&cx.cs);
        unwrap!(rtd_cs.set_high());
        let rtd = Rtd::new(spi, rtd_cs, delay);

        // Setup TEC DAC, output off until the loop or the host says so
        let mut dac = TecDac::new(
            gpiob.pb0.into_push_pull_output(&cx.cs),
            gpiob.pb1.into_push_pull_output(&cx.cs),
            gpiob.pb4.into_push_pull_output(&cx.cs),
        );
        unwrap!(dac.set(DacCode::ZERO));

        // Setup tick timer; the control loop arms it with its period
        let tick = TickTimer::new(cx.device.TIM3, rcc.clocks.pclk());

        (
            Shared { tick },
            Local {
                usart: Some(usart),
                rtd: Some(rtd),
                dac: Some(dac),
            },
        )
    }

    #[idle(shared = [tick], local = [usart, rtd, dac])]
    fn idle(cx: idle::Context) -> ! {
        let mut ctl = TempController::new(
            unwrap!(cx.local.usart.take()),
            unwrap!(cx.local.rtd.take()),
            unwrap!(cx.local.dac.take()),
            BangBang,
            LockedTick(cx.shared.tick),
            MonoClock,
            &CONTROL_FLAG,
        );

        info!("control loop running");

        // Busy poll: the USART has a one-byte receiver, so the loop must
        // keep draining it; wfi would stall intake between ticks.
        loop {
            ctl.poll();
        }
    }

    #[task(priority = 1)]
    async fn blinky(_: blinky::Context, mut pin: Pin<Output<PushPull>>) {
        unwrap!(pin.set_low());
        let mut now = Mono::now();
        loop {
            unwrap!(pin.toggle());
            now += 500.millis();
            Mono::delay_until(now).await;
        }
    }

    #[task(priority = 1)]
    async fn watchdog(_: watchdog::Context, wdg: IWDG) {
        let mut wdg = Watchdog::new(wdg);
        wdg.start(1.hz());

        loop {
            wdg.feed();
            Mono::delay(100.millis()).await;
        }
    }

    #[task(binds = TIM3, priority = 2, shared = [tick])]
    fn tick(mut cx: tick::Context) {
        // Strictly acknowledge-and-flag: every other piece of state
        // belongs to the main context.
        cx.shared.tick.lock(TickTimer::acknowledge);
        CONTROL_FLAG.raise();
    }

    timestamp!("{=u64:us}", {
        Mono::now().duration_since_epoch().to_micros()
    });
}
