pub mod core;
pub mod storage;
pub mod index;
pub mod scoring;
pub mod import;

/*
┌────────────────────────────────────────────────────────────────────────────────┐
│                           EXPSTORE STRUCT ARCHITECTURE                          │
└────────────────────────────────────────────────────────────────────────────────┘

┌─────────────────────────────────── CORE LAYER ─────────────────────────────────┐
│                                                                                │
│  ┌──────────────────────────────────────────────────────────────────────────┐ │
│  │                         struct ExperienceStore                           │ │
│  │ config: RwLock<StoreConfig>           // mode, read-only, concurrent    │ │
│  │ paused / dirty / loading: AtomicBool  // lifecycle flags                │ │
│  │ index: RwLock<Arc<PositionIndex>>     // published snapshot             │ │
│  │ pending: Mutex<Vec<PersistedLearningMove>>  // facts awaiting persist   │ │
│  │ loader: Mutex<Option<JoinHandle>>     // background load                │ │
│  └──────────────────────────────────────────────────────────────────────────┘ │
│                                                                                │
│  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────────────┐ │
│  │ struct Fingerprint│ │ struct Move      │  │ struct StoreStats            │ │
│  │ • 0: u64 (zobrist)│ │ • 0: u16 packed  │  │ • positions / records        │ │
│  └──────────────────┘  └──────────────────┘  │ • last_load / last_persist   │ │
│                                               └──────────────────────────────┘ │
└────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── STORAGE LAYER ───────────────────────────────┐
│                                                                                │
│  ┌──────────────────────┐  ┌──────────────────────┐  ┌──────────────────────┐ │
│  │ struct Record        │  │ experience_file      │  │ struct FileLock      │ │
│  │ • key / mv           │  │ • load (mmap)        │  │ • flock on .lock     │ │
│  │ • value / depth      │  │ • save (tmp+rename)  │  │ • shared / exclusive │ │
│  │ • count (V2)         │  └──────────────────────┘  └──────────────────────┘ │
│  └──────────────────────┘                                                      │
│  ┌──────────────────────┐  ┌──────────────────────┐                           │
│  │ maintenance          │  │ import::converter    │                           │
│  │ • defrag / merge     │  │ • games -> records   │                           │
│  └──────────────────────┘  └──────────────────────┘                           │
└────────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── RELATIONSHIPS ───────────────────────────────┐
│                                                                                │
│  ExperienceStore ──loads──> experience_file ──decodes──> Record                │
│        │                                                                       │
│        ├──publishes──> Arc<PositionIndex> ──chains──> ChainNode ──> Record     │
│        │                                                                       │
│        ├──probe──> ExperienceView ──ranks_with──> Record::compare              │
│        │                                                                       │
│        └──show──> quality ──uses──> dyn Evaluator                              │
│                                                                                │
│  converter ──parses──> GameRecord ──replays──> shakmaty::Chess                 │
│                                                                                │
└────────────────────────────────────────────────────────────────────────────────┘
*/
