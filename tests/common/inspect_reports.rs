#![allow(dead_code)]

//! Trimmed `gst-inspect-1.0` reports for the elements of an x264 video
//! pipeline plus audiotestsrc.

use rtpcast::engine::backend::ElementInspector;

const VIDEOTESTSRC: &str = "Pad Templates:
  SRC template: 'src'
    Availability: Always
    Capabilities:
      video/x-raw
                 format: { (string)I420, (string)NV12 }
      video/x-bayer
                 format: { (string)bggr, (string)rggb }

Element Properties:
  is-live             : Whether to act as a live source
                        flags: readable, writable
                        Boolean. Default: false
  pattern             : Type of test pattern to generate
                        flags: readable, writable, controllable
                        Enum \"GstVideoTestSrcPattern\" Default: 0, \"smpte\"
                           (0): smpte            - SMPTE 100% color bars
                           (1): snow             - Random (television snow)
                           (18): ball             - Moving ball
";

const AUDIOTESTSRC: &str = "Pad Templates:
  SRC template: 'src'
    Availability: Always
    Capabilities:
      audio/x-raw
                 format: { (string)S16LE, (string)F32LE }

Element Properties:
  is-live             : Whether to act as a live source
                        flags: readable, writable
                        Boolean. Default: false
  wave                : Oscillator waveform
                        flags: readable, writable, controllable
                        Enum \"GstAudioTestSrcWave\" Default: 0, \"sine\"
                           (0): sine             - Sine
                           (8): ticks            - Periodic Ticks
";

const CAPSFILTER: &str = "Pad Templates:
  SINK template: 'sink'
    Availability: Always
    Capabilities:
      ANY

  SRC template: 'src'
    Availability: Always
    Capabilities:
      ANY

Element Properties:
  caps                : Restrict the possible allowed capabilities
                        flags: readable, writable
                        Caps (NULL)
";

const QUEUE: &str = "Pad Templates:
  SINK template: 'sink'
    Availability: Always
    Capabilities:
      ANY

  SRC template: 'src'
    Availability: Always
    Capabilities:
      ANY

Element Properties:
  leaky               : Where the queue leaks, if at all
                        flags: readable, writable
                        Enum \"GstQueueLeaky\" Default: 0, \"no\"
                           (0): no               - Not Leaky
                           (1): upstream         - Leaky on upstream (new buffers)
                           (2): downstream       - Leaky on downstream (old buffers)
  max-size-buffers    : Max. number of buffers in the queue (0=disable)
                        flags: readable, writable, changeable in NULL, READY, PAUSED or PLAYING state
                        Unsigned Integer. Range: 0 - 4294967295 Default: 200
";

const X264ENC: &str = "Pad Templates:
  SINK template: 'sink'
    Availability: Always
    Capabilities:
      video/x-raw
                  framerate: [ 0/1, 2147483647/1 ]
                     format: { (string)Y444, (string)I420, (string)NV12 }

  SRC template: 'src'
    Availability: Always
    Capabilities:
      video/x-h264
                  framerate: [ 0/1, 2147483647/1 ]

Element Properties:
  speed-preset        : Preset name for speed/quality tradeoff options
                        flags: readable, writable
                        Enum \"GstX264EncPreset\" Default: 6, \"medium\"
                           (0): None             - No preset
                           (1): ultrafast        - ultrafast
                           (6): medium           - medium
  tune                : Preset name for non-psychovisual tuning options
                        flags: readable, writable
                        Flags \"GstX264EncTune\" Default: 0x00000000, \"(none)\"
                           (0x00000004): zerolatency      - Zero latency
";

const H264PARSE: &str = "Pad Templates:
  SINK template: 'sink'
    Availability: Always
    Capabilities:
      video/x-h264

  SRC template: 'src'
    Availability: Always
    Capabilities:
      video/x-h264
                     parsed: true
";

const RTPH264PAY: &str = "Pad Templates:
  SINK template: 'sink'
    Availability: Always
    Capabilities:
      video/x-h264
          stream-format: avc

  SRC template: 'src'
    Availability: Always
    Capabilities:
      application/x-rtp
                      media: video

Element Properties:
  aggregate-mode      : Bundle suitable SPS/PPS NAL units into STAP-A aggregate packets
                        flags: readable, writable
                        Enum \"GstRtpH264AggregateMode\" Default: 1, \"zero-latency\"
                           (0): none             - Do not aggregate NAL units
                           (1): zero-latency     - Aggregate NAL units until a VCL unit is included
                           (2): max-stap         - Aggregate all NAL units with the same timestamp
  config-interval     : Send SPS and PPS Insertion Interval in seconds
                        flags: readable, writable
                        Integer. Range: -1 - 3600 Default: 0
";

const UDPSINK: &str = "Pad Templates:
  SINK template: 'sink'
    Availability: Always
    Capabilities:
      ANY

Element Properties:
  async               : Go asynchronously to PAUSED
                        flags: readable, writable
                        Boolean. Default: true
  host                : The host/IP/Multicast group to send the packets to
                        flags: readable, writable
                        String. Default: \"localhost\"
  port                : The port to send the packets to
                        flags: readable, writable
                        Integer. Range: 0 - 65535 Default: 5004
  sync                : Sync on the clock
                        flags: readable, writable
                        Boolean. Default: true
";

/// Inspector that knows only the canned factories; anything else fails
/// because the inspect program does not exist.
pub fn canned_inspector() -> ElementInspector {
    ElementInspector::with_program("/nonexistent/gst-inspect-1.0")
        .with_report("videotestsrc", VIDEOTESTSRC)
        .with_report("audiotestsrc", AUDIOTESTSRC)
        .with_report("capsfilter", CAPSFILTER)
        .with_report("queue", QUEUE)
        .with_report("x264enc", X264ENC)
        .with_report("h264parse", H264PARSE)
        .with_report("rtph264pay", RTPH264PAY)
        .with_report("udpsink", UDPSINK)
}
